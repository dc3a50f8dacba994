//! Service orchestrator: wires the upstream connector, sanitization pipeline, channel
//! broadcaster and history collector into one running instance. Grounded directly on the
//! original `main.py`'s `run_service` wiring, generalized from its single-process `asyncio.gather`
//! into explicit `tokio::spawn`ed tasks joined against a shared shutdown signal.
//!
//! This crate never opens a socket of its own (§1 Non-goals): [`Service::broadcaster`] is the
//! handle an embedding HTTP/WebSocket layer subscribes to in order to forward events to real
//! client sockets.

use crate::broadcaster::ChannelBroadcaster;
use crate::config::Config;
use crate::connector::{CallbackError, UpstreamConnector, UpstreamStatsHandle};
use crate::history_collector::HistoryCollector;
use crate::introspection::Snapshot;
use gamefeed_core::model::{Channel, Phase, SanitizedEvent};
use gamefeed_core::pipeline::SanitizationPipeline;
use gamefeed_integration::channel::BoundedTx;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tracing::{error, info};

/// Concrete subscriber transmitter kind this service's broadcaster hands out. An embedding
/// layer forwards the paired `tokio::sync::mpsc::Receiver<SanitizedEvent>` to real sockets.
pub type SubscriberTx = BoundedTx<SanitizedEvent>;

/// A running (or not-yet-started) instance of every non-socket component. Construct with
/// [`Service::new`], hand out subscriptions via [`Service::broadcaster`], then consume with
/// [`Service::run`].
pub struct Service {
    config: Config,
    pipeline: Arc<Mutex<SanitizationPipeline>>,
    broadcaster: Arc<ChannelBroadcaster<SubscriberTx>>,
    broadcaster_queue_rx: Option<mpsc::Receiver<SanitizedEvent>>,
    history: Arc<Mutex<HistoryCollector>>,
    connector: UpstreamConnector,
    started_at: Instant,
}

impl Service {
    pub fn new(config: Config) -> Self {
        let mut pipeline = SanitizationPipeline::new();
        let (broadcaster, broadcaster_queue_rx) =
            ChannelBroadcaster::new(config.broadcaster.max_queue_size);
        let history = Arc::new(Mutex::new(HistoryCollector::new(config.history_collection_interval)));

        for &channel in Channel::PRIMARY.iter() {
            let forward = broadcaster.clone();
            pipeline.on_event(
                channel,
                Box::new(move |event: &SanitizedEvent| forward.broadcast(event.clone())),
            );
        }

        let connector = UpstreamConnector::new(config.upstream_url.clone(), &config.upstream);

        Self {
            config,
            pipeline: Arc::new(Mutex::new(pipeline)),
            broadcaster,
            broadcaster_queue_rx: Some(broadcaster_queue_rx),
            history,
            connector,
            started_at: Instant::now(),
        }
    }

    /// The fan-out hub. An embedding HTTP/WebSocket layer calls
    /// [`ChannelBroadcaster::subscribe`] on this handle for every accepted client.
    pub fn broadcaster(&self) -> Arc<ChannelBroadcaster<SubscriberTx>> {
        self.broadcaster.clone()
    }

    pub fn upstream_stats_handle(&self) -> UpstreamStatsHandle {
        self.connector.stats_handle()
    }

    pub fn snapshot(&self, upstream: UpstreamStatsHandle) -> Snapshot {
        Snapshot::new(
            self.started_at.elapsed().as_secs(),
            upstream.snapshot(),
            self.pipeline.lock().stats(),
            self.broadcaster.stats(),
            self.history.lock().stats(),
        )
    }

    /// Run every component until `shutdown` fires. Consumes `self`: a fresh [`Service`] must be
    /// built for each run.
    pub async fn run(mut self, shutdown: Arc<Notify>) {
        let queue_rx = self
            .broadcaster_queue_rx
            .take()
            .expect("Service::run called more than once");

        let broadcaster = self.broadcaster.clone();
        let broadcast_task = tokio::spawn(broadcaster.run(queue_rx, shutdown.clone()));

        let pipeline = self.pipeline.clone();
        let history = self.history.clone();
        let broadcaster_for_history = self.broadcaster.clone();
        let last_rug_game_id = Arc::new(Mutex::new(String::new()));

        let on_message = move |raw: Value| -> Result<(), CallbackError> {
            let game_history_raw = extract_game_history(&raw);

            let events = pipeline.lock().process_raw(&raw);

            for event in &events {
                if event.channel != Channel::Game || event.phase != Phase::Rugged {
                    continue;
                }
                let mut last = last_rug_game_id.lock();
                if *last == event.game_id {
                    continue;
                }
                *last = event.game_id.clone();
                drop(last);

                let has_god_candle = event
                    .data
                    .get("has_god_candle")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                let records = history.lock().on_rug(game_history_raw.as_deref(), has_god_candle);
                for record in records {
                    match SanitizedEvent::new(
                        Channel::History,
                        "gameHistory",
                        &record,
                        &event.game_id,
                        event.phase,
                        event.timestamp,
                    ) {
                        Ok(history_event) => broadcaster_for_history.broadcast(history_event),
                        Err(error) => {
                            error!(?error, "failed to serialize collected history record");
                        }
                    }
                }
            }

            Ok(())
        };

        let stats_interval = Duration::from_secs(self.config.stats_interval_secs.max(1));
        let stats_pipeline = self.pipeline.clone();
        let stats_broadcaster = self.broadcaster.clone();
        let stats_history = self.history.clone();
        let stats_upstream = self.connector.stats_handle();
        let stats_shutdown = shutdown.clone();

        let connector = self.connector;
        let connector_task = tokio::spawn(connector.run(on_message, shutdown.clone()));
        let stats_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stats_shutdown.notified() => break,
                    _ = tokio::time::sleep(stats_interval) => {
                        let p = stats_pipeline.lock().stats();
                        let b = stats_broadcaster.stats();
                        let h = stats_history.lock().stats();
                        let u = stats_upstream.snapshot();
                        info!(
                            events_received = p.events_received,
                            game_events = p.game_events,
                            trade_events = p.trade_events,
                            history_records = h.records_collected,
                            ws_clients = b.clients_connected.saturating_sub(b.clients_disconnected),
                            upstream_state = %u.state,
                            "periodic stats"
                        );
                    }
                }
            }
        });

        let _ = tokio::join!(broadcast_task, connector_task, stats_task);
        info!("service stopped");
    }
}

/// Extract the raw `data.gameHistory` array from an upstream envelope, if this is a
/// `gameStateUpdate` carrying one. `GameTick` never retains this field (§3/§4.A), so the
/// history-collector wiring reads it directly off the envelope the connector received rather
/// than off the typed game event produced by the pipeline.
fn extract_game_history(raw: &Value) -> Option<Vec<Value>> {
    if raw.get("event_type").and_then(Value::as_str) != Some("gameStateUpdate") {
        return None;
    }
    raw.get("data")?
        .get("gameHistory")?
        .as_array()
        .cloned()
        .filter(|entries| !entries.is_empty())
}
