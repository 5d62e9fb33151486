use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::EnsembleGpError;
use serde::{Deserialize, Serialize};

/// Shape bounds of the combination trees and settings of the genetic operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Size of the classifier pool; leaves are drawn from `0..n_max`
    pub n_max: usize,
    pub max_depth: usize,
    pub min_children: usize,
    pub max_children: usize,
    /// Tag every combination node with a `v.NN` decision threshold
    pub weighted: bool,
    pub gaussian_stdv: f64,
    /// Share of threshold tokens resampled by a threshold mutation
    pub threshold_mutation_ratio: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            n_max: 20,
            max_depth: 3,
            min_children: 2,
            max_children: 7,
            weighted: false,
            gaussian_stdv: 0.15,
            threshold_mutation_ratio: 0.1,
        }
    }
}

impl ConfigSection for TreeConfig {
    fn section_name() -> &'static str {
        "tree"
    }

    fn validate(&self) -> Result<(), EnsembleGpError> {
        if self.n_max == 0 {
            return Err(EnsembleGpError::Configuration(
                "Classifier pool size must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(EnsembleGpError::Configuration(
                "Maximum tree depth must be at least 1".to_string(),
            ));
        }
        if self.min_children < 2 {
            return Err(EnsembleGpError::Configuration(
                "Combination nodes need at least 2 children".to_string(),
            ));
        }
        if self.max_children < self.min_children {
            return Err(EnsembleGpError::Configuration(format!(
                "max_children ({}) is lower than min_children ({})",
                self.max_children, self.min_children
            )));
        }
        if !(self.gaussian_stdv >= 0.0 && self.gaussian_stdv.is_finite()) {
            return Err(EnsembleGpError::Configuration(
                "Gaussian standard deviation must be a non-negative number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold_mutation_ratio) {
            return Err(EnsembleGpError::Configuration(
                "Threshold mutation ratio must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Tree".to_string(),
            fields: vec![
                FieldManifest::new(
                    "n_max",
                    "integer",
                    serde_json::json!(20),
                    (Some(1.0), None),
                    "Number of base classifiers in the pool",
                ),
                FieldManifest::new(
                    "max_depth",
                    "integer",
                    serde_json::json!(3),
                    (Some(1.0), None),
                    "Maximum nesting of combination nodes",
                ),
                FieldManifest::new(
                    "min_children",
                    "integer",
                    serde_json::json!(2),
                    (Some(2.0), None),
                    "Minimum children per combination node",
                ),
                FieldManifest::new(
                    "max_children",
                    "integer",
                    serde_json::json!(7),
                    (Some(2.0), None),
                    "Maximum children per combination node",
                ),
                FieldManifest::new(
                    "weighted",
                    "boolean",
                    serde_json::json!(false),
                    (None, None),
                    "Tag combination nodes with a decision threshold",
                ),
                FieldManifest::new(
                    "gaussian_stdv",
                    "float",
                    serde_json::json!(0.15),
                    (Some(0.0), None),
                    "Spread of the thresholds around 0.5",
                ),
                FieldManifest::new(
                    "threshold_mutation_ratio",
                    "float",
                    serde_json::json!(0.1),
                    (Some(0.0), Some(1.0)),
                    "Share of thresholds resampled per threshold mutation",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TreeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_arity() {
        let config = TreeConfig {
            min_children: 4,
            max_children: 3,
            ..TreeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_single_child_nodes() {
        let config = TreeConfig {
            min_children: 1,
            ..TreeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
