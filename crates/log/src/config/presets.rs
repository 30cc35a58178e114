//! Named configurations for binaries and test harnesses.

use super::{Config, DisplayConfig, Format};

/// Filter used by [`Config::development`]: engine internals at debug,
/// everything else at info.
pub const DEVELOPMENT_FILTER: &str = "info,tessera_action=debug,tessera_input=debug,tessera_metadata=debug";

/// Filter used by [`Config::test`] unless `TESSERA_LOG` overrides it.
pub const TEST_FILTER: &str = "warn,tessera_action=trace";

fn env_filter() -> Option<String> {
    std::env::var("TESSERA_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .filter(|filter| !filter.trim().is_empty())
}

impl Config {
    /// Read `TESSERA_LOG` (or `RUST_LOG`), `TESSERA_LOG_FORMAT` and
    /// `TESSERA_SERVICE` on top of the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = env_filter() {
            config.level = level;
        }
        if let Ok(format) = std::env::var("TESSERA_LOG_FORMAT") {
            config.format = Format::parse_lossy(&format);
        }
        config.service = std::env::var("TESSERA_SERVICE").ok();
        config
    }

    /// Pretty output with source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: DEVELOPMENT_FILTER.to_string(),
            format: Format::Pretty,
            display: DisplayConfig {
                source: true,
                ..DisplayConfig::default()
            },
            service: None,
        }
    }

    /// Flattened JSON, info level, no colors.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            display: DisplayConfig {
                colors: false,
                flatten: true,
                ..DisplayConfig::default()
            },
            service: std::env::var("TESSERA_SERVICE").ok(),
        }
    }

    /// Compact, timestamp-free output for test runs.
    #[must_use]
    pub fn test() -> Self {
        Self {
            level: env_filter().unwrap_or_else(|| TEST_FILTER.to_string()),
            format: Format::Compact,
            display: DisplayConfig {
                time: false,
                target: false,
                colors: false,
                ..DisplayConfig::default()
            },
            service: None,
        }
    }

    /// Replace the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn development_raises_engine_crates() {
        let dev = Config::development();
        assert_eq!(dev.format, Format::Pretty);
        assert!(dev.level.contains("tessera_action=debug"));
        assert!(dev.display.source);
    }

    #[test]
    fn production_is_flat_json() {
        let prod = Config::production();
        assert_eq!(prod.format, Format::Json);
        assert!(prod.display.flatten);
        assert!(!prod.display.colors);
    }

    #[test]
    fn test_preset_drops_timestamps() {
        let test = Config::test();
        assert_eq!(test.format, Format::Compact);
        assert!(!test.display.time);
        assert!(!test.display.target);
    }

    #[test]
    fn with_level_overrides_the_filter() {
        assert_eq!(Config::production().with_level("debug").level, "debug");
    }
}
