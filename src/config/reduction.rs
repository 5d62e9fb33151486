use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::EnsembleGpError;
use crate::types::Combiner;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub combiner: Combiner,
    /// Decision threshold of nodes without a threshold token
    pub default_threshold: f64,
    pub cache_capacity: usize,
    /// Worker threads for population evaluation; the global rayon pool when unset
    pub num_threads: Option<usize>,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            combiner: Combiner::Bipartitions,
            default_threshold: 0.5,
            cache_capacity: 10_000,
            num_threads: None,
        }
    }
}

impl ConfigSection for ReductionConfig {
    fn section_name() -> &'static str {
        "reduction"
    }

    fn validate(&self) -> Result<(), EnsembleGpError> {
        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(EnsembleGpError::Configuration(
                "Default threshold must be between 0 and 1".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(EnsembleGpError::Configuration(
                "Cache capacity must be at least 1".to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(EnsembleGpError::Configuration(
                "Number of threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Reduction".to_string(),
            fields: vec![
                FieldManifest::new(
                    "combiner",
                    "enum",
                    serde_json::json!("Bipartitions"),
                    (None, None),
                    "Combine bipartitions by voting or average confidences",
                ),
                FieldManifest::new(
                    "default_threshold",
                    "float",
                    serde_json::json!(0.5),
                    (Some(0.0), Some(1.0)),
                    "Vote share needed for a label to be relevant",
                ),
                FieldManifest::new(
                    "cache_capacity",
                    "integer",
                    serde_json::json!(10_000),
                    (Some(1.0), None),
                    "Reduced trees kept in memory across generations",
                ),
                FieldManifest::new(
                    "num_threads",
                    "integer",
                    serde_json::Value::Null,
                    (Some(1.0), None),
                    "Worker threads for population evaluation; all cores when unset",
                ),
            ],
        }
    }
}
