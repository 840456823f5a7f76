//! Options resolver: add-on options document -> environment contract.
//!
//! The hosting supervisor hands the add-on a JSON key-value document
//! (`/data/options.json`). The resolver flattens it into string pairs,
//! applies the pattern-list defaults, and exports one environment
//! variable per resolved key for the scan engine to inherit.
//!
//! # Resilience policy
//!
//! Malformed option values must never keep the scanner from starting.
//! A list that is absent, null, empty, or not actually a list of
//! strings resolves to its built-in default; a scalar that is not a
//! string, number, or boolean is dropped with a warning. The only
//! fatal path is the document itself being unreadable or not JSON.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    env_key, DEFAULT_EXCLUDE_PATTERNS, DEFAULT_INCLUDE_PATTERNS, LIST_KEYS, SCALAR_KEYS,
};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Default location of the supervisor-provided options document.
pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

/// The resolved add-on configuration: option key -> string value, built
/// once at startup and never mutated afterwards.
///
/// Pairs keep the declaration order of the option keys so logs and
/// exports stay deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pairs: Vec<(String, String)>,
}

impl ResolvedConfig {
    /// Load and resolve the options document at `path`.
    ///
    /// Propagates read and parse failures; resolution itself cannot
    /// fail.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let doc: Value = serde_json::from_str(&content)?;
        Ok(Self::resolve(&doc))
    }

    /// Resolve an already-parsed options document.
    pub fn resolve(doc: &Value) -> Self {
        let mut pairs = Vec::new();

        for &key in SCALAR_KEYS {
            if let Some(value) = scalar_value(key, doc.get(key)) {
                pairs.push((key.to_string(), value));
            }
        }
        for &key in LIST_KEYS {
            pairs.push((key.to_string(), join_list(key, doc.get(key))));
        }

        Self { pairs }
    }

    /// Look up a resolved value by option key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Resolved pairs in export order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Export every resolved value into the process environment under
    /// its `UPPER_SNAKE_CASE` name, for the scan program to inherit.
    pub fn export(&self) {
        for (key, value) in &self.pairs {
            std::env::set_var(env_key(key), value);
        }
    }

    /// Log one line per resolved setting for operator diagnosis.
    pub fn log_summary(&self) {
        for (key, value) in &self.pairs {
            if key == "mqtt_password" {
                info!("{}=<redacted>", env_key(key));
            } else {
                info!("{}={}", env_key(key), value);
            }
        }
    }
}

/// Render a scalar option as a string, or None when it should be
/// omitted from the environment.
fn scalar_value(key: &str, value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            warn!("Option '{key}' has unexpected type ({other}); omitting");
            None
        }
    }
}

/// Normalize a list option to a non-empty comma-joined string.
///
/// Absent, null, `[]`, non-list, list-with-non-strings, and
/// empty-after-join inputs all resolve to the built-in default.
fn join_list(key: &str, value: Option<&Value>) -> String {
    let defaults = match key {
        "include_patterns" => DEFAULT_INCLUDE_PATTERNS,
        _ => DEFAULT_EXCLUDE_PATTERNS,
    };
    let fallback = || defaults.join(",");

    let items = match value {
        None | Some(Value::Null) => return fallback(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("Option '{key}' is not a list ({other}); using default");
            return fallback();
        }
    };

    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    elements.push(trimmed.to_string());
                }
            }
            other => {
                warn!("Option '{key}' contains a non-string element ({other}); using default");
                return fallback();
            }
        }
    }

    if elements.is_empty() {
        return fallback();
    }
    elements.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const DEFAULT_INCLUDE: &str = "/dev/ttyUSB*,/dev/ttyACM*";
    const DEFAULT_EXCLUDE: &str = "/dev/ttyS*,/dev/input*,/dev/hidraw*";

    #[test]
    fn test_absent_lists_resolve_to_defaults() {
        let resolved = ResolvedConfig::resolve(&json!({}));
        assert_eq!(resolved.get("include_patterns"), Some(DEFAULT_INCLUDE));
        assert_eq!(resolved.get("exclude_patterns"), Some(DEFAULT_EXCLUDE));
    }

    #[test]
    fn test_null_lists_resolve_to_defaults() {
        let doc = json!({ "include_patterns": null, "exclude_patterns": null });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("include_patterns"), Some(DEFAULT_INCLUDE));
        assert_eq!(resolved.get("exclude_patterns"), Some(DEFAULT_EXCLUDE));
    }

    #[test]
    fn test_empty_list_resolves_to_default_not_empty_string() {
        let doc = json!({ "include_patterns": [] });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("include_patterns"), Some(DEFAULT_INCLUDE));
    }

    #[test]
    fn test_well_formed_list_joins_in_order() {
        let doc = json!({ "include_patterns": ["/dev/ttyACM*", "/dev/ttyUSB0", "/dev/serial*"] });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(
            resolved.get("include_patterns"),
            Some("/dev/ttyACM*,/dev/ttyUSB0,/dev/serial*")
        );
    }

    #[test]
    fn test_malformed_list_resolves_to_default() {
        for malformed in [json!("not-a-list"), json!(42), json!(true), json!({"a": 1})] {
            let doc = json!({ "exclude_patterns": malformed });
            let resolved = ResolvedConfig::resolve(&doc);
            assert_eq!(resolved.get("exclude_patterns"), Some(DEFAULT_EXCLUDE));
        }
    }

    #[test]
    fn test_list_with_non_string_element_resolves_to_default() {
        let doc = json!({ "include_patterns": ["/dev/ttyACM0", 7] });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("include_patterns"), Some(DEFAULT_INCLUDE));
    }

    #[test]
    fn test_list_elements_are_trimmed() {
        let doc = json!({ "include_patterns": [" /dev/ttyACM0 ", "/dev/ttyUSB0"] });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(
            resolved.get("include_patterns"),
            Some("/dev/ttyACM0,/dev/ttyUSB0")
        );
    }

    #[test]
    fn test_list_of_blank_strings_resolves_to_default() {
        let doc = json!({ "include_patterns": ["", "   "] });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("include_patterns"), Some(DEFAULT_INCLUDE));
    }

    #[test]
    fn test_documented_scenario() {
        // include_patterns = ["/dev/ttyACM0"], exclude_patterns = null
        let doc = json!({ "include_patterns": ["/dev/ttyACM0"], "exclude_patterns": null });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("include_patterns"), Some("/dev/ttyACM0"));
        assert_eq!(resolved.get("exclude_patterns"), Some(DEFAULT_EXCLUDE));
    }

    #[test]
    fn test_scalars_pass_through_as_strings() {
        let doc = json!({
            "mqtt_broker": "mqtt://core-mosquitto:1883",
            "scan_interval": 2.5,
            "retry_attempts": 3,
            "enable_discovery": false,
        });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("mqtt_broker"), Some("mqtt://core-mosquitto:1883"));
        assert_eq!(resolved.get("scan_interval"), Some("2.5"));
        assert_eq!(resolved.get("retry_attempts"), Some("3"));
        assert_eq!(resolved.get("enable_discovery"), Some("false"));
    }

    #[test]
    fn test_absent_scalars_are_omitted() {
        let resolved = ResolvedConfig::resolve(&json!({}));
        assert_eq!(resolved.get("mqtt_broker"), None);
        assert_eq!(resolved.get("probe_command"), None);
        // Only the two list keys are always present.
        assert_eq!(resolved.pairs().len(), 2);
    }

    #[test]
    fn test_null_and_malformed_scalars_are_omitted() {
        let doc = json!({ "mqtt_broker": null, "probe_command": ["AT"] });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("mqtt_broker"), None);
        assert_eq!(resolved.get("probe_command"), None);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let doc = json!({ "mystery_option": "x", "mqtt_broker": "b" });
        let resolved = ResolvedConfig::resolve(&doc);
        assert_eq!(resolved.get("mystery_option"), None);
        assert_eq!(resolved.get("mqtt_broker"), Some("b"));
    }
}
