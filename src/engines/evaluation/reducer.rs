use crate::config::ReductionConfig;
use crate::engines::generation::ast::{NodeKind, Tree};
use crate::engines::generation::grammar::Threshold;
use crate::error::{EnsembleGpError, Result};
use crate::types::{Combiner, Prediction};
use std::collections::HashMap;

/// Lookup of base classifier predictions by leaf index
pub trait PredictionSource {
    fn prediction(&self, index: usize) -> Option<&Prediction>;
}

impl PredictionSource for [Prediction] {
    fn prediction(&self, index: usize) -> Option<&Prediction> {
        self.get(index)
    }
}

impl PredictionSource for Vec<Prediction> {
    fn prediction(&self, index: usize) -> Option<&Prediction> {
        self.get(index)
    }
}

impl PredictionSource for HashMap<usize, Prediction> {
    fn prediction(&self, index: usize) -> Option<&Prediction> {
        self.get(&index)
    }
}

fn lookup<S: PredictionSource + ?Sized>(source: &S, index: usize) -> Result<&Prediction> {
    source.prediction(index).ok_or_else(|| {
        EnsembleGpError::MissingPrediction(format!("No prediction for classifier {}", index))
    })
}

/// Folds a tree into a single ensemble prediction.
///
/// Nodes are visited in post-order. Every combination node sums the
/// predictions of its children over the union of their labels, divides by the
/// per-label vote count and, for bipartitions, thresholds the mean. The result
/// waits in the node's slot until its parent takes it.
#[derive(Debug, Clone)]
pub struct TreeReducer {
    combiner: Combiner,
    default_threshold: f64,
}

impl Default for TreeReducer {
    fn default() -> Self {
        Self::from_config(&ReductionConfig::default())
    }
}

impl TreeReducer {
    pub fn new(combiner: Combiner, default_threshold: f64) -> Self {
        Self {
            combiner,
            default_threshold,
        }
    }

    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new(config.combiner, config.default_threshold)
    }

    pub fn combiner(&self) -> Combiner {
        self.combiner
    }

    pub fn reduce<S: PredictionSource + ?Sized>(&self, tree: &str, source: &S) -> Result<Prediction> {
        let parsed = Tree::parse(tree)?;
        self.reduce_parsed(&parsed, source)
    }

    pub fn reduce_parsed<S: PredictionSource + ?Sized>(
        &self,
        tree: &Tree,
        source: &S,
    ) -> Result<Prediction> {
        let mut slots: Vec<Option<Prediction>> = vec![None; tree.len()];

        for id in tree.post_order() {
            let NodeKind::Combiner {
                threshold,
                children,
            } = &tree.node(id).kind
            else {
                continue;
            };

            let mut combined: Option<Prediction> = None;
            for &child in children {
                match &tree.node(child).kind {
                    NodeKind::Leaf(index) => {
                        let prediction = lookup(source, *index)?;
                        if let Some(acc) = combined.as_mut() {
                            acc.accumulate(prediction)?;
                        } else {
                            combined = Some(prediction.clone());
                        }
                    }
                    NodeKind::Combiner { .. } => {
                        let prediction = slots[child].take().ok_or_else(|| {
                            EnsembleGpError::MissingPrediction(format!(
                                "Subtree at offset {} was not reduced",
                                tree.node(child).span.start
                            ))
                        })?;
                        if let Some(acc) = combined.as_mut() {
                            acc.accumulate(&prediction)?;
                        } else {
                            combined = Some(prediction);
                        }
                    }
                }
            }

            let mut combined = combined.ok_or_else(|| {
                EnsembleGpError::StructuralViolation(format!("Node {} has no children", id))
            })?;
            self.normalize(&mut combined, *threshold);
            slots[id] = Some(combined);
        }

        let root = tree.root();
        match &tree.node(root).kind {
            NodeKind::Leaf(index) => Ok(lookup(source, *index)?.clone()),
            NodeKind::Combiner { .. } => slots[root].take().ok_or_else(|| {
                EnsembleGpError::MissingPrediction("Root was not reduced".to_string())
            }),
        }
    }

    fn normalize(&self, prediction: &mut Prediction, threshold: Option<Threshold>) {
        match self.combiner {
            Combiner::Bipartitions => {
                let threshold = threshold.map_or(self.default_threshold, Threshold::value);
                prediction.divide_and_threshold(threshold);
            }
            Combiner::Confidences => prediction.divide(),
        }
    }
}
