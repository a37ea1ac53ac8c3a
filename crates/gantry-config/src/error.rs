//! Configuration error types

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing configuration
    #[error("Missing configuration: {0}")]
    MissingRequired(String),

    /// Invalid value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Configuration field that failed validation
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// Environment variable override error
    #[error("Environment error: {0}")]
    Environment(String),

    /// Malformed resource locator
    #[error("Invalid resource locator {spec:?}: {message}")]
    InvalidLocator {
        /// The locator string as supplied
        spec: String,
        /// What was wrong with it
        message: String,
    },
}
