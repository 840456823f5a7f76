//! Configuration error types for the config module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the add-on options document.
///
/// Note that option *values* never produce errors: missing scalars are
/// omitted and malformed lists fall back to their defaults. Only the
/// document itself failing to load is fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the options document
    #[error("Failed to read options document '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Options document is not valid JSON
    #[error("Failed to parse options document: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
