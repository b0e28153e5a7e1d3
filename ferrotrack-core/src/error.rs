//! Error types for the tracking store.

use thiserror::Error;

/// Errors raised by the tracking store and its client.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported tracking URI: {0}")]
    UnsupportedUri(String),

    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("Experiment already exists: {0}")]
    ExperimentExists(String),

    #[error("Experiment {0} is not active")]
    ExperimentNotActive(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run {0} is not active")]
    RunNotActive(String),

    #[error("Param '{key}' already logged with value '{old}', refusing to overwrite with '{new}'")]
    ParamConflict {
        key: String,
        old: String,
        new: String,
    },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    #[error("Corrupt store entry: {0}")]
    Corrupt(String),
}

impl TrackingError {
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Result alias used throughout the tracking store.
pub type TrackingResult<T> = Result<T, TrackingError>;
