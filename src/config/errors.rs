//! Configuration Error Types
//!
//! Every configuration error is fatal: the process must not start with a
//! configuration it cannot honor.

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {message}")]
    Read { path: String, message: String },

    /// File is not valid JSON for the config model
    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A field holds a value that cannot be used
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Check if this error is fatal.
    pub fn is_fatal(&self) -> bool {
        true
    }
}
