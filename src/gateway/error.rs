//! Gateway configuration error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConnectionError;

/// Result type for configuration access.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading the gateway configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required top-level section is absent.
    #[error("configuration has no `{0}` section")]
    MissingSection(&'static str),

    /// An entity is present but malformed.
    #[error("entity `{alias}` is invalid: {message}")]
    InvalidEntity { alias: String, message: String },

    /// The data source could not be resolved to a connection.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl ConfigError {
    pub(crate) fn invalid_entity(alias: &str, message: impl Into<String>) -> Self {
        Self::InvalidEntity {
            alias: alias.to_string(),
            message: message.into(),
        }
    }
}
