use super::{reduction::ReductionConfig, traits::ConfigSection, tree::TreeConfig};
use crate::error::EnsembleGpError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment variables overriding file settings,
/// e.g. `ENSEMBLEGP__TREE__MAX_DEPTH=4`
pub const ENV_PREFIX: &str = "ENSEMBLEGP";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub seed: Option<u64>,
    pub tree: TreeConfig,
    pub reduction: ReductionConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EnsembleGpError> {
        self.tree.validate()?;
        self.reduction.validate()?;
        Ok(())
    }

    /// Field manifests of every section as pretty JSON, keyed by section name
    pub fn manifest_json(&self) -> Result<String, EnsembleGpError> {
        let mut sections = serde_json::Map::new();
        sections.insert(
            TreeConfig::section_name().to_string(),
            serde_json::to_value(self.tree.to_manifest())?,
        );
        sections.insert(
            ReductionConfig::section_name().to_string(),
            serde_json::to_value(self.reduction.to_manifest())?,
        );
        Ok(serde_json::to_string_pretty(&serde_json::Value::Object(sections))?)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EnsembleGpError> {
        let contents = std::fs::read_to_string(path)?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| EnsembleGpError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    /// Load an optional TOML file, then apply `ENSEMBLEGP__SECTION__FIELD`
    /// environment overrides on top of it.
    pub fn load_layered(&self, path: Option<&Path>) -> Result<(), EnsembleGpError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        log::debug!("Loaded configuration: {:?}", config);
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EnsembleGpError> {
        let config = self.config.read().unwrap_or_else(|e| e.into_inner());
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| EnsembleGpError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` and keep the result only if it still validates
    pub fn update<F>(&self, f: F) -> Result<(), EnsembleGpError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut updated = config.clone();
        f(&mut updated);
        updated.validate()?;
        *config = updated;
        Ok(())
    }
}
