//! Library error enums for the root crate. See the module docs on [`crate::connector`] and
//! [`crate::config`] for where each variant originates.

use thiserror::Error;

/// Errors surfaced by the upstream connector's connect/receive loop. All variants are
/// non-fatal at the orchestrator level — the connector logs and retries via its backoff policy.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("failed to dial upstream {url}: {source}")]
    Dial {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// Startup configuration errors. Always fatal: the service exits before opening any socket.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path} as TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
