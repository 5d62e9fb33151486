use crate::config::{ConfigSection, ReductionConfig};
use crate::data::ReductionCache;
use crate::engines::evaluation::pool::PredictionPool;
use crate::engines::evaluation::reducer::TreeReducer;
use crate::error::{EnsembleGpError, Result};
use crate::types::Prediction;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Reduces a whole generation against a shared pool
pub struct PopulationEvaluator {
    pool: Arc<PredictionPool>,
    reducer: TreeReducer,
    cache: Option<Arc<ReductionCache>>,
    workers: Option<ThreadPool>,
}

impl PopulationEvaluator {
    pub fn new(pool: Arc<PredictionPool>, reducer: TreeReducer) -> Self {
        Self {
            pool,
            reducer,
            cache: None,
            workers: None,
        }
    }

    /// Evaluator with a cache sized from the config and, when `num_threads`
    /// is set, its own worker pool
    pub fn from_config(pool: Arc<PredictionPool>, config: &ReductionConfig) -> Result<Self> {
        config.validate()?;
        let mut evaluator = Self::new(pool, TreeReducer::from_config(config))
            .with_cache(Arc::new(ReductionCache::new(config.cache_capacity)));

        if let Some(threads) = config.num_threads {
            let workers = ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| {
                    EnsembleGpError::Configuration(format!("Failed to build thread pool: {}", e))
                })?;
            evaluator.workers = Some(workers);
        }
        Ok(evaluator)
    }

    pub fn with_cache(mut self, cache: Arc<ReductionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<ReductionCache>> {
        self.cache.as_ref()
    }

    pub fn pool(&self) -> &PredictionPool {
        &self.pool
    }

    /// Reduce every tree in parallel. Results follow the input order; the
    /// first error aborts the batch.
    pub fn evaluate<T>(&self, trees: &[T]) -> Result<Vec<Arc<Prediction>>>
    where
        T: AsRef<str> + Sync,
    {
        let run = || {
            trees
                .par_iter()
                .map(|tree| self.evaluate_one(tree.as_ref()))
                .collect::<Result<Vec<_>>>()
        };
        let results = match &self.workers {
            Some(workers) => workers.install(run),
            None => run(),
        }?;

        if let Some(cache) = &self.cache {
            log::info!(
                "Evaluated {} trees (cache: {} hits, {} misses, {} entries)",
                trees.len(),
                cache.hits(),
                cache.misses(),
                cache.len()
            );
        } else {
            log::info!("Evaluated {} trees", trees.len());
        }
        Ok(results)
    }

    pub fn evaluate_one(&self, tree: &str) -> Result<Arc<Prediction>> {
        let Some(cache) = &self.cache else {
            return Ok(Arc::new(self.reducer.reduce(tree, self.pool.as_ref())?));
        };

        if let Some(hit) = cache.get(tree) {
            return Ok(hit);
        }
        let reduced = Arc::new(self.reducer.reduce(tree, self.pool.as_ref())?);
        Ok(cache.insert(tree.to_string(), reduced))
    }
}
