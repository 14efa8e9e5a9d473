//! Host configuration.
//!
//! Layered, lowest to highest precedence:
//!
//! 1. defaults embedded from `host.toml`,
//! 2. an optional TOML file (any subset of keys),
//! 3. `MOUSE_COMMANDER_LOG` for the log filter.
//!
//! Configuration is read once at startup and never written back.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::codec::MAX_FROM_BROWSER;
use crate::error::ConfigError;

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "MOUSE_COMMANDER_CONFIG";
/// Env var overriding `log.level`.
pub const LOG_ENV: &str = "MOUSE_COMMANDER_LOG";

/// The embedded defaults, as shipped.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../host.toml");

static DEFAULTS: Lazy<HostConfig> = Lazy::new(|| {
    toml::from_str(DEFAULT_CONFIG_TOML).expect("embedded host.toml must be a complete config")
});

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Bound of the reader → dispatcher queue.
    pub queue_capacity: usize,
    /// Largest inbound frame accepted.
    pub max_message_bytes: usize,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub level: String,
    /// Append to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    queue_capacity: Option<usize>,
    max_message_bytes: Option<usize>,
    log: Option<PartialLogConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialLogConfig {
    level: Option<String>,
    file: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        DEFAULTS.clone()
    }
}

impl HostConfig {
    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = path {
            let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            config.merge(parse_partial(&raw, &path.display().to_string())?);
        }
        if let Ok(level) = env::var(LOG_ENV) {
            if !level.trim().is_empty() {
                config.log.level = level;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `raw`. Ignores the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge(parse_partial(raw, "<string>")?);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.max_message_bytes == 0 || self.max_message_bytes > MAX_FROM_BROWSER {
            return Err(ConfigError::Invalid(format!(
                "max_message_bytes must be between 1 and {MAX_FROM_BROWSER}"
            )));
        }
        EnvFilter::try_new(&self.log.level).map_err(|e| {
            ConfigError::Invalid(format!("log.level {:?}: {e}", self.log.level))
        })?;
        Ok(())
    }

    fn merge(&mut self, partial: PartialConfig) {
        if let Some(capacity) = partial.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(max) = partial.max_message_bytes {
            self.max_message_bytes = max;
        }
        if let Some(log) = partial.log {
            if let Some(level) = log.level {
                self.log.level = level;
            }
            if log.file.is_some() {
                self.log.file = log.file;
            }
        }
    }
}

fn parse_partial(raw: &str, origin: &str) -> Result<PartialConfig, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}
