//! Engine configuration.
//!
//! Configuration is layered: built-in defaults, then an optional file, then
//! environment variables such as `PDP__CACHE__MAX_ENTRIES=5000`.

use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PDP";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Evaluation settings
    pub engine: EngineConfig,
    /// Decision cache settings
    pub cache: CacheConfig,
    /// Logging and counters
    pub telemetry: TelemetryConfig,
    /// Content preloading
    pub content: ContentConfig,
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest path accepted by policy updates
    pub max_path_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_path_depth: 64 }
    }
}

/// Decision cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether decisions are cached
    pub enabled: bool,
    /// Maximum number of cached decisions
    pub max_entries: usize,
    /// Lifetime of a cached decision in seconds
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Lifetime of a cached decision.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl_secs: 60,
        }
    }
}

/// Logging and counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether decision counters are kept
    pub enabled: bool,
    /// Service name attached to log records
    pub service_name: String,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "pdp-engine".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Content preloading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// JSON content documents loaded at startup
    pub files: Vec<PathBuf>,
}

impl Config {
    /// Load defaults overridden by the environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load defaults overridden by a file, then by the environment.
    ///
    /// The file format follows its extension (`.toml`, `.json`, `.yaml`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Config::default()).map_err(config_error)?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_path_depth == 0 {
            return Err(Error::config_key(
                "path depth must be positive",
                "engine.max_path_depth",
            ));
        }

        if self.cache.enabled {
            if self.cache.max_entries == 0 {
                return Err(Error::config_key(
                    "cache size must be positive",
                    "cache.max_entries",
                ));
            }
            if self.cache.ttl_secs == 0 {
                return Err(Error::config_key("cache ttl must be positive", "cache.ttl_secs"));
            }
        }

        let level = self.telemetry.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::config_key(
                format!("unknown log level {}", self.telemetry.log_level),
                "telemetry.log_level",
            ));
        }

        Ok(())
    }
}

fn config_error(e: ::config::ConfigError) -> Error {
    Error::config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.engine.max_path_depth, 64);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "cache": {{ "max_entries": 32, "ttl_secs": 5 }},
                "telemetry": {{ "log_level": "debug", "json_logs": true }},
                "content": {{ "files": ["content/registry.json"] }}
            }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.cache.max_entries, 32);
        assert_eq!(config.cache.ttl_secs, 5);
        assert!(config.cache.enabled);
        assert_eq!(config.telemetry.log_level, "debug");
        assert!(config.telemetry.json_logs);
        assert_eq!(config.telemetry.service_name, "pdp-engine");
        assert_eq!(config.content.files, vec![PathBuf::from("content/registry.json")]);
    }

    #[test]
    fn test_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "telemetry": {{ "log_level": "loud" }} }}"#).unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "telemetry.log_level"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());

        config.cache.enabled = false;
        assert!(config.validate().is_ok());

        config.engine.max_path_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("PDP__ENGINE__MAX_PATH_DEPTH", "7");
        let config = Config::from_env();
        std::env::remove_var("PDP__ENGINE__MAX_PATH_DEPTH");

        assert_eq!(config.unwrap().engine.max_path_depth, 7);
    }
}
