//! Configuration loading errors

/// Error loading a configuration document
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Document is not valid JSON
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Document is not valid YAML
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Document root is not a mapping
    #[error("configuration root must be a mapping, found {0}")]
    NotAMapping(&'static str),
}

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
