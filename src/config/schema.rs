//! Configuration schema definitions.
//!
//! Two views of the same configuration exist:
//!
//! - The add-on options document handled by [`crate::config::resolver`],
//!   a free-form JSON object whose keys are listed in [`OPTION_KEYS`].
//! - [`Settings`], the typed view the scan engine consumes, built from
//!   the environment variables the resolver exported.

use std::time::Duration;

/// Default include patterns when the option is absent, null, or malformed.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["/dev/ttyUSB*", "/dev/ttyACM*"];

/// Default exclude patterns when the option is absent, null, or malformed.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["/dev/ttyS*", "/dev/input*", "/dev/hidraw*"];

/// Scalar option keys passed through to the environment verbatim.
///
/// Absent or null entries are omitted rather than defaulted; the scan
/// engine supplies its own fallbacks for the subset it understands.
pub const SCALAR_KEYS: &[&str] = &[
    "mqtt_broker",
    "mqtt_username",
    "mqtt_password",
    "scan_interval",
    "enable_discovery",
    "discovery_prefix",
    "probe_command",
    "device_timeout",
    "retry_attempts",
    "retry_delay",
    "message_queue_size",
    "identification_timeout",
    "enable_device_detection",
];

/// List-valued option keys. These always resolve to a non-empty
/// comma-joined string, falling back to the built-in defaults.
pub const LIST_KEYS: &[&str] = &["include_patterns", "exclude_patterns"];

/// Environment variable name for an option key (`mqtt_broker` -> `MQTT_BROKER`).
pub fn env_key(option: &str) -> String {
    option.to_ascii_uppercase()
}

/// Typed configuration for the scan engine.
///
/// Built from the process environment via [`Settings::from_env`]; the
/// launcher exports the variables before the engine starts, so a value
/// read here is always the launcher's resolved one or the engine-side
/// default below.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Broker address, `mqtt://host:port` or bare `host[:port]`.
    pub mqtt_broker: String,
    pub mqtt_username: String,
    pub mqtt_password: String,
    /// Seconds between port enumeration passes.
    pub scan_interval: f64,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Publish Home Assistant MQTT Discovery configs for attached ports.
    pub enable_discovery: bool,
    pub discovery_prefix: String,
    /// Optional identification command written once to each new port.
    pub probe_command: String,
}

impl Settings {
    /// Build settings from the process environment.
    ///
    /// Unset variables fall back to the engine defaults. A boolean
    /// variable that is set to anything other than `"true"`
    /// (case-insensitive) reads as `false`.
    pub fn from_env() -> Self {
        Self {
            mqtt_broker: env_or("MQTT_BROKER", "mqtt://homeassistant:1883"),
            mqtt_username: env_or("MQTT_USERNAME", ""),
            mqtt_password: env_or("MQTT_PASSWORD", ""),
            scan_interval: env_or("SCAN_INTERVAL", "1.0").parse().unwrap_or(1.0),
            include_patterns: split_csv(&env_or(
                "INCLUDE_PATTERNS",
                &DEFAULT_INCLUDE_PATTERNS.join(","),
            )),
            exclude_patterns: split_csv(&env_or(
                "EXCLUDE_PATTERNS",
                &DEFAULT_EXCLUDE_PATTERNS.join(","),
            )),
            enable_discovery: env_or("ENABLE_DISCOVERY", "true").eq_ignore_ascii_case("true"),
            discovery_prefix: env_or("DISCOVERY_PREFIX", "homeassistant"),
            probe_command: env_or("PROBE_COMMAND", ""),
        }
    }

    /// Scan interval as a Duration, clamped below at 100ms so a
    /// misconfigured zero or negative interval cannot spin the loop.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs_f64(self.scan_interval.max(0.1))
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Split a comma-joined value into trimmed, non-empty elements.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_engine_env() {
        for key in [
            "MQTT_BROKER",
            "MQTT_USERNAME",
            "MQTT_PASSWORD",
            "SCAN_INTERVAL",
            "INCLUDE_PATTERNS",
            "EXCLUDE_PATTERNS",
            "ENABLE_DISCOVERY",
            "DISCOVERY_PREFIX",
            "PROBE_COMMAND",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_environment() {
        clear_engine_env();

        let settings = Settings::from_env();
        assert_eq!(settings.mqtt_broker, "mqtt://homeassistant:1883");
        assert_eq!(settings.scan_interval, 1.0);
        assert_eq!(settings.include_patterns, DEFAULT_INCLUDE_PATTERNS);
        assert_eq!(settings.exclude_patterns, DEFAULT_EXCLUDE_PATTERNS);
        assert!(settings.enable_discovery);
        assert_eq!(settings.discovery_prefix, "homeassistant");
        assert_eq!(settings.probe_command, "");
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_engine_env();
        std::env::set_var("MQTT_BROKER", "mqtt://core-mosquitto:1884");
        std::env::set_var("SCAN_INTERVAL", "2.5");
        std::env::set_var("INCLUDE_PATTERNS", "/dev/ttyACM0, /dev/ttyUSB1");
        std::env::set_var("ENABLE_DISCOVERY", "no");

        let settings = Settings::from_env();
        assert_eq!(settings.mqtt_broker, "mqtt://core-mosquitto:1884");
        assert_eq!(settings.scan_interval, 2.5);
        assert_eq!(settings.include_patterns, vec!["/dev/ttyACM0", "/dev/ttyUSB1"]);
        assert!(!settings.enable_discovery);

        clear_engine_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_interval_falls_back() {
        clear_engine_env();
        std::env::set_var("SCAN_INTERVAL", "fast");

        let settings = Settings::from_env();
        assert_eq!(settings.scan_interval, 1.0);

        clear_engine_env();
    }

    #[test]
    fn test_scan_interval_clamped() {
        let mut settings = Settings {
            mqtt_broker: String::new(),
            mqtt_username: String::new(),
            mqtt_password: String::new(),
            scan_interval: 0.0,
            include_patterns: vec![],
            exclude_patterns: vec![],
            enable_discovery: false,
            discovery_prefix: String::new(),
            probe_command: String::new(),
        };
        assert_eq!(settings.scan_interval(), Duration::from_millis(100));

        settings.scan_interval = 3.0;
        assert_eq!(settings.scan_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_split_csv_trims_and_drops_empties() {
        assert_eq!(split_csv("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ").is_empty());
    }

    #[test]
    fn test_env_key_naming() {
        assert_eq!(env_key("mqtt_broker"), "MQTT_BROKER");
        assert_eq!(env_key("include_patterns"), "INCLUDE_PATTERNS");
    }
}
