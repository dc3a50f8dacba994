//! Long-lived reconnecting client to the upstream feed. Directly grounded on the original
//! `upstream.py`'s `UpstreamClient`, with its `asyncio`/`websockets` receive loop replaced by
//! `gamefeed-integration`'s `tokio-tungstenite` plumbing
//! ([`gamefeed_integration::protocol::websocket`]) and its ad hoc backoff counter replaced by
//! the teacher's [`gamefeed_integration::backoff::ReconnectionState`]
//! (`barter-data/src/streams/reconnect/stream.rs`).

use crate::config::UpstreamConfig;
use crate::error::ConnectorError;
use futures::{SinkExt, StreamExt};
use gamefeed_integration::backoff::{ReconnectionBackoffPolicy, ReconnectionState};
use gamefeed_integration::protocol::websocket::{connect, WebSocketSerdeParser, WsMessage};
use gamefeed_integration::protocol::StreamParser;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// A callback-side failure while handling one inbound event. The connector itself never
/// produces these; they model a downstream handler (e.g. the sanitization pipeline) rejecting a
/// message, per §7's "Result-returning callbacks" error taxonomy.
#[derive(Debug, Error)]
#[error("upstream message callback failed: {0}")]
pub struct CallbackError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectorState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Reconnecting = 3,
}

impl ConnectorState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectorState::Connecting,
            2 => ConnectorState::Connected,
            3 => ConnectorState::Reconnecting,
            _ => ConnectorState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorState::Disconnected => "disconnected",
            ConnectorState::Connecting => "connecting",
            ConnectorState::Connected => "connected",
            ConnectorState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default)]
struct Counters {
    state: AtomicU8,
    connections: AtomicU64,
    disconnections: AtomicU64,
    messages_received: AtomicU64,
    parse_errors: AtomicU64,
    callback_errors: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpstreamStats {
    pub state: String,
    pub url: String,
    pub connections: u64,
    pub disconnections: u64,
    pub messages_received: u64,
    pub parse_errors: u64,
    pub callback_errors: u64,
}

/// A cheap, cloneable read handle onto a running [`UpstreamConnector`]'s counters, for use by a
/// periodic stats task that doesn't own the connector itself (it was moved into its `run` task).
#[derive(Debug, Clone)]
pub struct UpstreamStatsHandle {
    url: Arc<str>,
    counters: Arc<Counters>,
}

impl UpstreamStatsHandle {
    pub fn snapshot(&self) -> UpstreamStats {
        UpstreamStats {
            state: ConnectorState::from_u8(self.counters.state.load(Ordering::Relaxed)).to_string(),
            url: self.url.to_string(),
            connections: self.counters.connections.load(Ordering::Relaxed),
            disconnections: self.counters.disconnections.load(Ordering::Relaxed),
            messages_received: self.counters.messages_received.load(Ordering::Relaxed),
            parse_errors: self.counters.parse_errors.load(Ordering::Relaxed),
            callback_errors: self.counters.callback_errors.load(Ordering::Relaxed),
        }
    }
}

/// Maintains exactly one logical connection to the upstream feed, reconnecting with exponential
/// backoff on every disconnection. Consumed by [`Self::run`]; take a [`Self::stats_handle`]
/// beforehand if another task needs read access to its counters.
pub struct UpstreamConnector {
    url: Arc<str>,
    backoff: ReconnectionState,
    ping_interval: Duration,
    counters: Arc<Counters>,
}

impl UpstreamConnector {
    pub fn new(url: impl Into<String>, config: &UpstreamConfig) -> Self {
        let policy = ReconnectionBackoffPolicy::new(
            config.initial_reconnect_delay_secs * 1000,
            2,
            config.max_reconnect_delay_secs * 1000,
        );
        Self {
            url: Arc::from(url.into()),
            backoff: ReconnectionState::from(policy),
            ping_interval: Duration::from_secs(config.ping_interval_secs),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn stats_handle(&self) -> UpstreamStatsHandle {
        UpstreamStatsHandle {
            url: self.url.clone(),
            counters: self.counters.clone(),
        }
    }

    fn set_state(&self, state: ConnectorState) {
        self.counters.state.store(state as u8, Ordering::Relaxed);
    }

    /// Connect-and-serve forever, invoking `on_message` for every successfully parsed JSON
    /// envelope, until `shutdown` fires. Each loop iteration is: dial, run the receive loop
    /// until disconnection, then wait out the current backoff before redialing.
    pub async fn run(
        mut self,
        mut on_message: impl FnMut(Value) -> Result<(), CallbackError>,
        shutdown: Arc<Notify>,
    ) {
        loop {
            self.set_state(ConnectorState::Connecting);
            info!(url = %self.url, "connecting to upstream");

            let dialed = tokio::select! {
                biased;
                _ = shutdown.notified() => break,
                result = connect(self.url.to_string()) => result,
            };

            match dialed {
                Ok(ws) => {
                    self.set_state(ConnectorState::Connected);
                    self.backoff.reset_backoff();
                    self.counters.connections.fetch_add(1, Ordering::Relaxed);
                    info!(url = %self.url, "connected to upstream");

                    if self.receive_loop(ws, &mut on_message, &shutdown).await {
                        break; // shutdown observed mid-stream
                    }
                }
                Err(gamefeed_integration::error::SocketError::WebSocket(source)) => {
                    let error = ConnectorError::Dial {
                        url: self.url.to_string(),
                        source,
                    };
                    warn!(url = %self.url, %error, "failed to dial upstream");
                }
                Err(error) => {
                    warn!(url = %self.url, %error, "failed to dial upstream");
                }
            }

            self.set_state(ConnectorState::Reconnecting);
            self.counters.disconnections.fetch_add(1, Ordering::Relaxed);

            let wait = self.backoff.current();
            info!(?wait, "reconnecting to upstream");
            tokio::select! {
                biased;
                _ = shutdown.notified() => break,
                _ = self.backoff.wait_and_multiply() => {}
            }
        }

        self.set_state(ConnectorState::Disconnected);
        info!("upstream connector stopped");
    }

    /// Serve one connection until it closes or `shutdown` fires. Returns `true` if shutdown was
    /// observed (the caller should stop reconnecting), `false` on an ordinary disconnection.
    async fn receive_loop(
        &mut self,
        mut ws: gamefeed_integration::protocol::websocket::WebSocket,
        on_message: &mut impl FnMut(Value) -> Result<(), CallbackError>,
        shutdown: &Arc<Notify>,
    ) -> bool {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    let _ = ws.close(None).await;
                    return true;
                }
                _ = tokio::time::sleep(self.ping_interval) => {
                    if ws.send(WsMessage::Ping(Default::default())).await.is_err() {
                        return false;
                    }
                }
                message = ws.next() => {
                    let Some(message) = message else { return false };
                    match <WebSocketSerdeParser as StreamParser<Value>>::parse(message) {
                        Some(Ok(value)) => {
                            self.counters.messages_received.fetch_add(1, Ordering::Relaxed);
                            if let Err(error) = on_message(value) {
                                self.counters.callback_errors.fetch_add(1, Ordering::Relaxed);
                                warn!(%error, "upstream message callback failed");
                            }
                        }
                        Some(Err(error)) => {
                            if gamefeed_integration::Unrecoverable::is_unrecoverable(&error) {
                                warn!(?error, "upstream connection terminated");
                                return false;
                            }
                            self.counters.parse_errors.fetch_add(1, Ordering::Relaxed);
                            debug!(?error, "failed to parse upstream message");
                        }
                        None => {} // ping/pong/control frame, nothing to dispatch
                    }
                }
            }
        }
    }
}
