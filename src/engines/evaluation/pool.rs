use crate::engines::evaluation::reducer::PredictionSource;
use crate::engines::generation::locator::leaf_spans;
use crate::error::{EnsembleGpError, Result};
use crate::types::Prediction;
use crate::utils::random::slot_rng;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Predictions of every base classifier, indexed by leaf number.
///
/// Built once, then only read.
#[derive(Debug, Clone)]
pub struct PredictionPool {
    predictions: Vec<Prediction>,
    n_labels: usize,
}

impl PredictionPool {
    /// Build `size` slots in parallel. Slot `i` gets its own generator derived
    /// from `(seed, i)`, so the pool does not depend on thread scheduling.
    pub fn build<F>(size: usize, seed: u64, builder: F) -> Result<Self>
    where
        F: Fn(usize, &mut StdRng) -> Result<Prediction> + Sync + Send,
    {
        let predictions = (0..size)
            .into_par_iter()
            .map(|index| {
                let mut rng = slot_rng(seed, index);
                builder(index, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let pool = Self::from_predictions(predictions)?;
        log::info!(
            "Built prediction pool: {} classifiers, {} labels, {} instances",
            pool.len(),
            pool.n_labels,
            pool.n_instances()
        );
        Ok(pool)
    }

    pub fn from_predictions(predictions: Vec<Prediction>) -> Result<Self> {
        if let Some(first) = predictions.first() {
            let expected = first.n_instances();
            if let Some((i, p)) = predictions
                .iter()
                .enumerate()
                .find(|(_, p)| p.n_instances() != expected)
            {
                return Err(EnsembleGpError::PredictionShape(format!(
                    "Classifier {} predicts {} instances, expected {}",
                    i,
                    p.n_instances(),
                    expected
                )));
            }
        }

        let n_labels = predictions
            .iter()
            .filter_map(|p| p.label_indices().last())
            .max()
            .map_or(0, |&l| l + 1);

        Ok(Self {
            predictions,
            n_labels,
        })
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Prediction> {
        self.predictions.get(index)
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    /// One more than the highest label covered by any classifier
    pub fn n_labels(&self) -> usize {
        self.n_labels
    }

    pub fn n_instances(&self) -> usize {
        self.predictions.first().map_or(0, Prediction::n_instances)
    }

    /// How many leaves of `tree` cover each label. Repeated leaves count
    /// every time they appear.
    pub fn votes_per_label(&self, tree: &str, n_labels: usize) -> Result<Vec<u32>> {
        let mut votes = vec![0u32; n_labels];
        for span in leaf_spans(tree) {
            let text = span.slice(tree);
            let index: usize = text.parse().map_err(|_| {
                EnsembleGpError::StructuralViolation(format!("Leaf '{}' is not a valid index", text))
            })?;
            let prediction = self.get(index).ok_or_else(|| {
                EnsembleGpError::MissingPrediction(format!("No prediction for classifier {}", index))
            })?;
            for &label in prediction.label_indices() {
                if let Some(v) = votes.get_mut(label) {
                    *v += 1;
                }
            }
        }
        Ok(votes)
    }

    /// Share of the pool's labels that get at least one vote in `tree`
    pub fn label_coverage(&self, tree: &str) -> Result<f64> {
        if self.n_labels == 0 {
            return Ok(0.0);
        }
        let votes = self.votes_per_label(tree, self.n_labels)?;
        let covered = votes.iter().filter(|&&v| v > 0).count();
        Ok(covered as f64 / self.n_labels as f64)
    }
}

/// Mean number of votes per label
pub fn avg_votes(votes: &[u32]) -> f64 {
    if votes.is_empty() {
        return 0.0;
    }
    votes.iter().map(|&v| v as f64).sum::<f64>() / votes.len() as f64
}

impl PredictionSource for PredictionPool {
    fn prediction(&self, index: usize) -> Option<&Prediction> {
        self.get(index)
    }
}
