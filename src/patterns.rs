//! Glob-based include/exclude filtering of device paths.
//!
//! Patterns use shell-style globs (`/dev/ttyUSB*`). A device path is a
//! candidate iff it matches at least one include pattern and no exclude
//! pattern. Invalid glob syntax coming from configuration is skipped
//! with a warning, consistent with the resolver's fallback policy.

use glob::Pattern;
use tracing::warn;

/// A compiled set of glob patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile patterns, skipping any with invalid glob syntax.
    pub fn compile(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    warn!("Skipping invalid glob pattern '{raw}': {err}");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// True if any pattern matches the path.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Include/exclude filter deciding which enumerated ports get a reader.
#[derive(Debug, Clone)]
pub struct PortFilter {
    include: PatternSet,
    exclude: PatternSet,
}

impl PortFilter {
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Self {
        Self {
            include: PatternSet::compile(include_patterns),
            exclude: PatternSet::compile(exclude_patterns),
        }
    }

    /// True if the device path should be scanned.
    pub fn allows(&self, path: &str) -> bool {
        self.include.matches(path) && !self.exclude.matches(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_include_glob_matches() {
        let set = PatternSet::compile(&strings(&["/dev/ttyUSB*", "/dev/ttyACM*"]));
        assert!(set.matches("/dev/ttyUSB0"));
        assert!(set.matches("/dev/ttyACM12"));
        assert!(!set.matches("/dev/ttyS0"));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let set = PatternSet::compile(&strings(&["[unclosed", "/dev/ttyUSB*"]));
        assert!(set.matches("/dev/ttyUSB1"));
        assert!(!set.matches("[unclosed"));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = PatternSet::compile(&[]);
        assert!(set.is_empty());
        assert!(!set.matches("/dev/ttyUSB0"));
    }

    #[test]
    fn test_filter_applies_include_then_exclude() {
        let filter = PortFilter::new(
            &strings(&["/dev/tty*"]),
            &strings(&["/dev/ttyS*", "/dev/input*", "/dev/hidraw*"]),
        );
        assert!(filter.allows("/dev/ttyUSB0"));
        assert!(filter.allows("/dev/ttyACM0"));
        assert!(!filter.allows("/dev/ttyS0"));
        assert!(!filter.allows("/dev/input0"));
        assert!(!filter.allows("/dev/video0"));
    }

    #[test]
    fn test_default_pattern_sets() {
        let filter = PortFilter::new(
            &strings(crate::config::DEFAULT_INCLUDE_PATTERNS),
            &strings(crate::config::DEFAULT_EXCLUDE_PATTERNS),
        );
        assert!(filter.allows("/dev/ttyUSB0"));
        assert!(filter.allows("/dev/ttyACM3"));
        assert!(!filter.allows("/dev/ttyS1"));
        assert!(!filter.allows("/dev/hidraw0"));
    }
}
