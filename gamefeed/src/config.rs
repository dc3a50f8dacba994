//! Layered configuration: built-in defaults -> optional TOML file -> environment variables
//! (prefixed `GAMEFEED_`). Mirrors the teacher's `PerfConfig` loading pattern
//! (`cooprefr-bettersys/rust-backend/src/performance/config.rs`), swapping its single flat
//! struct for the nested `broadcaster`/`upstream` sub-configs this service needs.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    9017
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_history_collection_interval() -> u32 {
    10
}

fn default_stats_interval_secs() -> u64 {
    300
}

fn default_max_queue_size() -> usize {
    1000
}

fn default_ping_interval_secs() -> u64 {
    20
}

fn default_ping_timeout_secs() -> u64 {
    10
}

fn default_close_timeout_secs() -> u64 {
    5
}

fn default_initial_reconnect_delay_secs() -> u64 {
    1
}

fn default_max_reconnect_delay_secs() -> u64 {
    30
}

/// Top-level service configuration. See §6 of the design spec for the full key table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the upstream connector dials. Required — empty is rejected by [`Config::validate`].
    #[serde(default)]
    pub upstream_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Every Nth rug triggers a history collection; a god candle on the same tick always does.
    #[serde(default = "default_history_collection_interval")]
    pub history_collection_interval: u32,

    #[serde(default)]
    pub broadcaster: BroadcasterConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Cadence, in seconds, of the periodic aggregate-counter log line.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: String::new(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            history_collection_interval: default_history_collection_interval(),
            broadcaster: BroadcasterConfig::default(),
            upstream: UpstreamConfig::default(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcasterConfig {
    /// Bounded queue capacity between the pipeline and the fan-out loop.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
    #[serde(default = "default_close_timeout_secs")]
    pub close_timeout_secs: u64,
    #[serde(default = "default_initial_reconnect_delay_secs")]
    pub initial_reconnect_delay_secs: u64,
    #[serde(default = "default_max_reconnect_delay_secs")]
    pub max_reconnect_delay_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            close_timeout_secs: default_close_timeout_secs(),
            initial_reconnect_delay_secs: default_initial_reconnect_delay_secs(),
            max_reconnect_delay_secs: default_max_reconnect_delay_secs(),
        }
    }
}

impl Config {
    /// Load a TOML file at `path`, falling back to [`Config::default`] if the file does not
    /// exist. A present-but-unparseable file is a hard [`ConfigError`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        match std::fs::read_to_string(path_ref) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path_ref.display().to_string(),
                source,
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path_ref.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path_ref.display().to_string(),
                source,
            }),
        }
    }

    /// Layer environment variable overrides (prefixed `GAMEFEED_`) on top of `self`.
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = std::env::var("GAMEFEED_UPSTREAM_URL") {
            self.upstream_url = v;
        }
        if let Ok(v) = std::env::var("GAMEFEED_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("GAMEFEED_PORT") {
            self.port = parse_env("GAMEFEED_PORT", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("GAMEFEED_HISTORY_COLLECTION_INTERVAL") {
            self.history_collection_interval = parse_env("GAMEFEED_HISTORY_COLLECTION_INTERVAL", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_BROADCASTER_MAX_QUEUE_SIZE") {
            self.broadcaster.max_queue_size = parse_env("GAMEFEED_BROADCASTER_MAX_QUEUE_SIZE", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_UPSTREAM_PING_INTERVAL") {
            self.upstream.ping_interval_secs = parse_env("GAMEFEED_UPSTREAM_PING_INTERVAL", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_UPSTREAM_PING_TIMEOUT") {
            self.upstream.ping_timeout_secs = parse_env("GAMEFEED_UPSTREAM_PING_TIMEOUT", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_UPSTREAM_CLOSE_TIMEOUT") {
            self.upstream.close_timeout_secs = parse_env("GAMEFEED_UPSTREAM_CLOSE_TIMEOUT", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_UPSTREAM_INITIAL_RECONNECT_DELAY") {
            self.upstream.initial_reconnect_delay_secs =
                parse_env("GAMEFEED_UPSTREAM_INITIAL_RECONNECT_DELAY", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_UPSTREAM_MAX_RECONNECT_DELAY") {
            self.upstream.max_reconnect_delay_secs = parse_env("GAMEFEED_UPSTREAM_MAX_RECONNECT_DELAY", &v)?;
        }
        if let Ok(v) = std::env::var("GAMEFEED_STATS_INTERVAL_SECS") {
            self.stats_interval_secs = parse_env("GAMEFEED_STATS_INTERVAL_SECS", &v)?;
        }
        Ok(self)
    }

    /// Load the file at `path` (if present) and layer environment overrides on top.
    pub fn load_layered(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(path)?.apply_env_overrides()
    }

    /// Reject configurations that would fail at connect time rather than at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "upstream_url",
                reason: "must be set (GAMEFEED_UPSTREAM_URL or config file)".to_owned(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        reason: format!("{raw:?} is not a valid value"),
    })
}
