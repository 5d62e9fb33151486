use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnsembleGpError {
    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    #[error("Allowed depth is negative: node at depth {depth} exceeds maximum {max_depth}")]
    AllowedDepthNegative { depth: usize, max_depth: usize },

    #[error("Missing prediction: {0}")]
    MissingPrediction(String),

    #[error("Infeasible individual: {0}")]
    InfeasibleIndividual(String),

    #[error("Prediction shape error: {0}")]
    PredictionShape(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config source error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnsembleGpError>;
