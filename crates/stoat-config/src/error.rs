/// All errors that can occur while resolving experiment configurations.
///
/// Configuration errors are fatal: they are raised before any training
/// starts, so callers are expected to fail fast rather than recover.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An experiment references a task that is not in the task table.
    #[error("experiment '{experiment}' references unknown task '{task}'")]
    UnknownTask { experiment: String, task: String },

    /// Lookup of an experiment name that was never registered.
    #[error("unknown experiment '{0}'")]
    UnknownExperiment(String),

    /// A model tag that is not one of the supported builders.
    #[error("unknown model type '{0}'")]
    UnknownModel(String),

    /// A required key is missing from a merged configuration.
    #[error("experiment '{experiment}' is missing required key '{key}'")]
    MissingKey { experiment: String, key: String },

    /// A config value has the wrong type for its key.
    #[error("key '{key}': expected {expected}, got {got}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        got: String,
    },

    /// I/O error while persisting a resolved config.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl ConfigError {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        ConfigError::Msg(s.into())
    }
}

/// Convenience Result type used throughout stoat-config.
pub type Result<T> = std::result::Result<T, ConfigError>;
