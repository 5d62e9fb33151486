use crate::error::{EnsembleGpError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How a combination node merges the predictions of its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Combiner {
    /// Majority vote over 0/1 bipartitions, thresholded at every node
    #[default]
    Bipartitions,
    /// Plain average of confidences
    Confidences,
}

/// Predictions of one classifier (or one combined subtree) over all instances.
///
/// Values are stored row-major: `values[instance][column]`, where column `c`
/// refers to the global label `label_indices[c]`. Label indices are kept
/// sorted so two predictions can be merged in a single pass.
///
/// `label_votes[c]` is the number of votes accumulated for a column. A fresh
/// prediction carries one vote per label; after normalization a combined
/// prediction is reset to one vote so it counts as a single unit for its
/// parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    label_indices: Vec<usize>,
    label_votes: Vec<u32>,
    values: Vec<Vec<f64>>,
}

impl Prediction {
    /// Build a prediction from a label subset and its per-instance values.
    ///
    /// Columns are reordered so that label indices are ascending.
    pub fn new(label_indices: Vec<usize>, values: Vec<Vec<f64>>) -> Result<Self> {
        for (i, row) in values.iter().enumerate() {
            if row.len() != label_indices.len() {
                return Err(EnsembleGpError::PredictionShape(format!(
                    "Instance {} has {} values but {} labels are covered",
                    i,
                    row.len(),
                    label_indices.len()
                )));
            }
        }

        let mut order: Vec<usize> = (0..label_indices.len()).collect();
        order.sort_by_key(|&c| label_indices[c]);

        let sorted_labels: Vec<usize> = order.iter().map(|&c| label_indices[c]).collect();
        if sorted_labels.windows(2).any(|w| w[0] == w[1]) {
            return Err(EnsembleGpError::PredictionShape(format!(
                "Duplicated label index in {:?}",
                label_indices
            )));
        }

        let values = values
            .into_iter()
            .map(|row| order.iter().map(|&c| row[c]).collect())
            .collect();

        Ok(Self {
            label_votes: vec![1; sorted_labels.len()],
            label_indices: sorted_labels,
            values,
        })
    }

    /// Prediction covering no labels, used as an accumulator
    pub fn empty(n_instances: usize) -> Self {
        Self {
            label_indices: Vec::new(),
            label_votes: Vec::new(),
            values: vec![Vec::new(); n_instances],
        }
    }

    pub fn n_instances(&self) -> usize {
        self.values.len()
    }

    pub fn label_indices(&self) -> &[usize] {
        &self.label_indices
    }

    pub fn label_votes(&self) -> &[u32] {
        &self.label_votes
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Value for an instance and a global label index, if the label is covered
    pub fn value(&self, instance: usize, label: usize) -> Option<f64> {
        let column = self.label_indices.binary_search(&label).ok()?;
        self.values.get(instance).map(|row| row[column])
    }

    /// True when every label in `0..n_labels` is covered
    pub fn covers_all(&self, n_labels: usize) -> bool {
        self.label_indices.len() == n_labels
            && self.label_indices.iter().enumerate().all(|(i, &l)| i == l)
    }

    /// Add `other` into `self`, summing values and votes over the union of
    /// both label sets.
    pub fn accumulate(&mut self, other: &Prediction) -> Result<()> {
        if self.n_instances() != other.n_instances() {
            return Err(EnsembleGpError::PredictionShape(format!(
                "Cannot combine predictions over {} and {} instances",
                self.n_instances(),
                other.n_instances()
            )));
        }

        let mut labels = Vec::with_capacity(self.label_indices.len() + other.label_indices.len());
        let mut votes = Vec::with_capacity(labels.capacity());
        let mut plan: Vec<(Option<usize>, Option<usize>)> = Vec::with_capacity(labels.capacity());

        let (mut i, mut j) = (0, 0);
        loop {
            let ordering = match (self.label_indices.get(i), other.label_indices.get(j)) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };

            match ordering {
                Ordering::Less => {
                    labels.push(self.label_indices[i]);
                    votes.push(self.label_votes[i]);
                    plan.push((Some(i), None));
                    i += 1;
                }
                Ordering::Greater => {
                    labels.push(other.label_indices[j]);
                    votes.push(other.label_votes[j]);
                    plan.push((None, Some(j)));
                    j += 1;
                }
                Ordering::Equal => {
                    labels.push(self.label_indices[i]);
                    votes.push(self.label_votes[i] + other.label_votes[j]);
                    plan.push((Some(i), Some(j)));
                    i += 1;
                    j += 1;
                }
            }
        }

        for (row, other_row) in self.values.iter_mut().zip(&other.values) {
            let merged = plan
                .iter()
                .map(|&(a, b)| {
                    a.map_or(0.0, |c| row[c]) + b.map_or(0.0, |c| other_row[c])
                })
                .collect();
            *row = merged;
        }

        self.label_indices = labels;
        self.label_votes = votes;
        Ok(())
    }

    /// Divide every value by its label's vote count and reset votes to one
    pub fn divide(&mut self) {
        for row in &mut self.values {
            for (value, &votes) in row.iter_mut().zip(&self.label_votes) {
                *value /= votes as f64;
            }
        }
        self.label_votes.iter_mut().for_each(|v| *v = 1);
    }

    /// Divide by vote counts, then map to 1.0 when the mean reaches
    /// `threshold` and 0.0 otherwise. Votes are reset to one.
    pub fn divide_and_threshold(&mut self, threshold: f64) {
        for row in &mut self.values {
            for (value, &votes) in row.iter_mut().zip(&self.label_votes) {
                *value = if *value / votes as f64 >= threshold { 1.0 } else { 0.0 };
            }
        }
        self.label_votes.iter_mut().for_each(|v| *v = 1);
    }

    /// Bipartition of every instance given a threshold
    pub fn bipartition(&self, threshold: f64) -> Vec<Vec<bool>> {
        self.values
            .iter()
            .map(|row| row.iter().map(|&v| v >= threshold).collect())
            .collect()
    }
}
