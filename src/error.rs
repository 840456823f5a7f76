//! Unified application error type.

use crate::config::ConfigError;
use crate::launcher::LaunchError;
use thiserror::Error;

/// Top-level error for the binary's startup path.
///
/// The scan loop itself never fails once started; everything that can
/// go wrong fatally happens while resolving options or handing off.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Result type for startup operations.
pub type AppResult<T> = Result<T, AppError>;
