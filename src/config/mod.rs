//! Configuration module for the multi serial scanner add-on.
//!
//! # Configuration flow
//!
//! 1. The supervisor writes the user's add-on options to a JSON
//!    document (`/data/options.json` by default).
//! 2. [`ResolvedConfig::load`] reads the document, applies the
//!    pattern-list defaults, and flattens every option to a string.
//! 3. [`ResolvedConfig::export`] publishes the resolved values as
//!    `UPPER_SNAKE_CASE` environment variables.
//! 4. The scan engine (in-process or handed off) builds its typed
//!    [`Settings`] from that environment via [`Settings::from_env`].
//!
//! Option values are handled with a deliberate resilience policy:
//! malformed input falls back to defaults instead of failing, so a bad
//! option can never keep the scanner from starting.

mod error;
mod resolver;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use resolver::{ResolvedConfig, DEFAULT_OPTIONS_PATH};
pub use schema::{
    env_key, split_csv, Settings, DEFAULT_EXCLUDE_PATTERNS, DEFAULT_INCLUDE_PATTERNS, LIST_KEYS,
    SCALAR_KEYS,
};
