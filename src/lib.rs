//! Multi Serial Scanner Library
//!
//! Home Assistant add-on that watches serial device paths and bridges
//! their output to MQTT. The binary plays two roles: a launcher that
//! resolves add-on options into an environment contract, and the scan
//! engine that consumes that contract.
//!
//! # Modules
//!
//! - `config`: options resolution, environment export, engine settings
//! - `launcher`: preflight checks and process hand-off
//! - `patterns`: include/exclude glob filtering of device paths
//! - `mqtt`: broker connection, topics, and payload shapes
//! - `scanner`: scan loop and per-port reader tasks
//! - `error`: unified error handling

pub mod config;
pub mod error;
pub mod launcher;
pub mod mqtt;
pub mod patterns;
pub mod scanner;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ConfigResult, ResolvedConfig, Settings};
pub use error::{AppError, AppResult};
pub use launcher::{LaunchError, LaunchResult};
pub use mqtt::{MqttError, MqttPublisher};
pub use patterns::{PatternSet, PortFilter};
