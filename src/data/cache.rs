use crate::types::Prediction;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Reduced predictions keyed by tree string, shared across evaluation threads
pub struct ReductionCache {
    data: Mutex<HashMap<String, Arc<Prediction>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ReductionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(HashMap::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, tree: &str) -> Option<Arc<Prediction>> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        let found = data.get(tree).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store `value` unless another thread got there first; either way the
    /// stored prediction is returned.
    pub fn insert(&self, tree: String, value: Arc<Prediction>) -> Arc<Prediction> {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = data.get(&tree) {
            return Arc::clone(existing);
        }
        if data.len() >= self.capacity {
            // Clear everything when full
            log::warn!("Reduction cache full ({} entries), clearing", data.len());
            data.clear();
        }
        data.insert(tree, Arc::clone(&value));
        value
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
