//! Configuration loading and resolution
//!
//! Settings come from a TOML file with every field defaulted. Resolution
//! priority for each setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the dashboard logs a warning and
//! starts on defaults. A file that exists but does not parse is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "WWM_CONFIG";

/// Environment variable overriding the backend base URL
pub const BASE_URL_ENV_VAR: &str = "WWM_BASE_URL";

/// Reconnect delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffPolicy {
    Fixed,
    Exponential,
}

/// Push-channel reconnect policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub policy: BackoffPolicy,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            policy: BackoffPolicy::Exponential,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let millis = match self.policy {
            BackoffPolicy::Fixed => self.initial_delay_ms,
            BackoffPolicy::Exponential => {
                let factor = self.multiplier.powi(attempt.min(32) as i32);
                let scaled = self.initial_delay_ms as f64 * factor;
                scaled.min(self.max_delay_ms as f64) as u64
            }
        };
        Duration::from_millis(millis.min(self.max_delay_ms))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Backend origin, also the prefix for resolved image references
    pub base_url: String,

    /// Path prefix of the JSON API (e.g. `/api`)
    pub api_prefix: String,

    /// Path of the push-event stream
    pub events_path: String,

    /// Bound on every snapshot and correction request
    pub request_timeout_ms: u64,

    /// Capacity of the signal and command queues feeding the engine
    pub event_channel_capacity: usize,

    pub reconnect: ReconnectConfig,

    pub logging: LoggingConfig,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            api_prefix: "/api".to_string(),
            events_path: "/events".to_string(),
            request_timeout_ms: 10_000,
            event_channel_capacity: 256,
            reconnect: ReconnectConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            url.push('/');
            url.push_str(segment);
        }
    }
    url
}

impl DashConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {e}")))
    }

    /// Load a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML (used to write a starter config)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Timeout applied to each request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Absolute URL of an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.base_url, &[&self.api_prefix, path])
    }

    /// Absolute URL of the push-event stream
    pub fn events_url(&self) -> String {
        join_url(&self.base_url, &[&self.events_path])
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base_url must be an absolute http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be > 0".to_string()));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Config("event_channel_capacity must be > 0".to_string()));
        }
        let reconnect = &self.reconnect;
        if reconnect.initial_delay_ms == 0 {
            return Err(Error::Config("reconnect.initial_delay_ms must be > 0".to_string()));
        }
        if reconnect.initial_delay_ms > reconnect.max_delay_ms {
            return Err(Error::Config(
                "reconnect.initial_delay_ms exceeds reconnect.max_delay_ms".to_string(),
            ));
        }
        if reconnect.multiplier.is_nan() || reconnect.multiplier < 1.0 {
            return Err(Error::Config("reconnect.multiplier must be >= 1.0".to_string()));
        }
        Ok(())
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub log_level: Option<String>,
}

/// Default config file location: `<config_dir>/wwm/dash.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wwm").join("dash.toml"))
}

/// Resolve the effective configuration
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<DashConfig> {
    // Config file: CLI > env > default location
    let config_path = overrides
        .config_path
        .clone()
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .or_else(default_config_path);

    let mut config = match config_path {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "Loading dashboard config");
            DashConfig::load_file(&path)?
        }
        Some(path) => {
            warn!(
                path = %path.display(),
                "Config file not found, using compiled defaults"
            );
            DashConfig::default()
        }
        None => {
            warn!("No config directory on this platform, using compiled defaults");
            DashConfig::default()
        }
    };

    // Base URL: CLI > env > file
    if let Some(url) = overrides.base_url.clone() {
        config.base_url = url;
    } else if let Ok(url) = std::env::var(BASE_URL_ENV_VAR) {
        config.base_url = url;
    }

    if let Some(level) = overrides.log_level.clone() {
        config.logging.level = level;
    }

    config.validate()?;
    Ok(config)
}
