//! Sanitization pipeline: wraps the phase detector, trade annotator, and god-candle detector,
//! dispatches by upstream `event_type`, and fans typed [`SanitizedEvent`]s out to per-channel
//! callbacks.

use crate::god_candle::{GodCandleDetector, GodCandleStats};
use crate::model::{raw, Channel, GameHistoryRecord, GameTick, Phase, SanitizedEvent, SessionStats, Trade};
use crate::phase_detector::{PhaseDetector, PhaseDetectorStats};
use crate::trade_annotator::TradeAnnotator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// A callback registered on a [`Channel`]. Runs inline on the task that calls
/// [`SanitizationPipeline::process_raw`] — see the crate-level docs on detector ownership.
pub type EventCallback = Box<dyn FnMut(&SanitizedEvent) + Send>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub events_received: u64,
    pub game_events: u64,
    pub stats_events: u64,
    pub trade_events: u64,
    pub history_events: u64,
    pub other_events: u64,
    pub parse_errors: u64,
    pub empty_events: u64,
    pub phase: PhaseDetectorStats,
    pub god_candle: GodCandleStats,
}

/// Recognized upstream `event_type` values. Everything else increments `other_events`.
const EVENT_GAME_STATE_UPDATE: &str = "gameStateUpdate";
const EVENT_NEW_TRADE: &str = "standard/newTrade";

/// Orchestrates [`PhaseDetector`], [`TradeAnnotator`], and [`GodCandleDetector`], splitting one
/// upstream event into zero-or-more typed output records on distinct logical channels.
///
/// Detector state is single-owner: this pipeline must only be driven from one task at a time
/// (see the concurrency notes on the root `gamefeed::connector` module).
pub struct SanitizationPipeline {
    phase_detector: PhaseDetector,
    trade_annotator: TradeAnnotator,
    god_candle_detector: GodCandleDetector,
    callbacks: [Vec<EventCallback>; 5],
    stats: PipelineCounters,
}

#[derive(Debug, Default)]
struct PipelineCounters {
    events_received: u64,
    game_events: u64,
    stats_events: u64,
    trade_events: u64,
    history_events: u64,
    other_events: u64,
    parse_errors: u64,
    empty_events: u64,
}

impl std::fmt::Debug for SanitizationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanitizationPipeline")
            .field("phase_detector", &self.phase_detector)
            .field("god_candle_detector", &self.god_candle_detector)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for SanitizationPipeline {
    fn default() -> Self {
        Self {
            phase_detector: PhaseDetector::new(),
            trade_annotator: TradeAnnotator::new(),
            god_candle_detector: GodCandleDetector::new(),
            callbacks: Default::default(),
            stats: PipelineCounters::default(),
        }
    }
}

fn channel_slot(channel: Channel) -> usize {
    match channel {
        Channel::Game => 0,
        Channel::Stats => 1,
        Channel::Trades => 2,
        Channel::History => 3,
        Channel::All => 4,
    }
}

impl SanitizationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase_detector(&self) -> &PhaseDetector {
        &self.phase_detector
    }

    pub fn trade_annotator(&self) -> &TradeAnnotator {
        &self.trade_annotator
    }

    /// Register a callback invoked for every [`SanitizedEvent`] emitted on `channel`. Multiple
    /// callbacks may be registered on the same channel; they run in registration order.
    pub fn on_event(&mut self, channel: Channel, callback: EventCallback) {
        self.callbacks[channel_slot(channel)].push(callback);
    }

    /// Record that the caller failed to parse an upstream frame into JSON before it ever reached
    /// [`Self::process_raw`]. Kept separate from the empty/unknown-type counters: those describe
    /// a well-formed envelope this pipeline chose not to act on, this describes a frame that
    /// never became one.
    pub fn record_parse_error(&mut self) {
        self.stats.parse_errors += 1;
    }

    /// Process one upstream envelope `{event_type, data, timestamp?, game_id?}`, returning every
    /// [`SanitizedEvent`] produced (for test visibility) while also invoking registered
    /// callbacks. Parse errors, empty data, and missing types are counted and dropped, never
    /// propagated.
    pub fn process_raw(&mut self, raw_message: &Value) -> Vec<SanitizedEvent> {
        let event_type = raw::str_or(raw_message, "event_type", "");
        let data = raw::obj(raw_message, "data");

        let Some(data) = data.filter(|d| !matches!(d, Value::Object(m) if m.is_empty())) else {
            self.stats.empty_events += 1;
            return Vec::new();
        };
        if event_type.is_empty() {
            self.stats.empty_events += 1;
            return Vec::new();
        }

        self.stats.events_received += 1;

        let timestamp = raw::str_opt(raw_message, "timestamp")
            .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        match event_type.as_str() {
            EVENT_GAME_STATE_UPDATE => self.process_game_state(data, timestamp),
            EVENT_NEW_TRADE => self.process_trade(data, timestamp),
            _ => {
                self.stats.other_events += 1;
                Vec::new()
            }
        }
    }

    fn process_game_state(&mut self, data: &Value, timestamp: DateTime<Utc>) -> Vec<SanitizedEvent> {
        let mut events = Vec::new();
        let game_id = raw::str_or(data, "gameId", "");

        let phase = self.phase_detector.detect(data);
        self.phase_detector.process(data);

        let coins = raw::array(data, "availableShitcoins");
        if !coins.is_empty() {
            self.trade_annotator.update_practice_tokens(Some(coins));
        }

        let mut game_tick = GameTick::from_raw(data, phase);
        if let Some(daily) = game_tick.daily_records.clone() {
            game_tick.has_god_candle = self.god_candle_detector.check(Some(&daily));
        }

        let game_event = build_event(Channel::Game, EVENT_GAME_STATE_UPDATE, &game_tick, &game_id, phase, timestamp);
        self.emit(Channel::Game, &game_event);
        events.push(game_event);
        self.stats.game_events += 1;

        let stats = SessionStats::from_raw(data);
        let stats_event = build_event(Channel::Stats, EVENT_GAME_STATE_UPDATE, &stats, &game_id, phase, timestamp);
        self.emit(Channel::Stats, &stats_event);
        events.push(stats_event);
        self.stats.stats_events += 1;

        let history_entries = raw::array(data, "gameHistory");
        if !history_entries.is_empty() {
            for entry_raw in history_entries {
                let record = GameHistoryRecord::from_raw(entry_raw);
                let history_event =
                    build_event(Channel::History, "gameHistory", &record, &record.id, phase, timestamp);
                self.emit(Channel::History, &history_event);
                events.push(history_event);
                self.stats.history_events += 1;
            }
        }

        for event in &events {
            self.emit(Channel::All, event);
        }

        events
    }

    fn process_trade(&mut self, data: &Value, timestamp: DateTime<Utc>) -> Vec<SanitizedEvent> {
        let game_id = raw::str_or(data, "gameId", "");
        let phase = self.phase_detector.current_phase();

        let mut trade = Trade::from_raw(data);
        self.trade_annotator.annotate(&mut trade, phase);

        let trade_event = build_event(Channel::Trades, EVENT_NEW_TRADE, &trade, &game_id, phase, timestamp);
        self.emit(Channel::Trades, &trade_event);
        self.emit(Channel::All, &trade_event);
        self.stats.trade_events += 1;

        vec![trade_event]
    }

    fn emit(&mut self, channel: Channel, event: &SanitizedEvent) {
        for callback in &mut self.callbacks[channel_slot(channel)] {
            callback(event);
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            events_received: self.stats.events_received,
            game_events: self.stats.game_events,
            stats_events: self.stats.stats_events,
            trade_events: self.stats.trade_events,
            history_events: self.stats.history_events,
            other_events: self.stats.other_events,
            parse_errors: self.stats.parse_errors,
            empty_events: self.stats.empty_events,
            phase: self.phase_detector.stats(),
            god_candle: self.god_candle_detector.stats(),
        }
    }
}

fn build_event(
    channel: Channel,
    event_type: &str,
    model: &impl Serialize,
    game_id: &str,
    phase: Phase,
    timestamp: DateTime<Utc>,
) -> SanitizedEvent {
    SanitizedEvent::new(channel, event_type, model, game_id, phase, timestamp).unwrap_or_else(|error| {
        warn!(?error, event_type, "failed to serialize sanitized record to JSON value");
        SanitizedEvent {
            channel,
            event_type: event_type.to_owned(),
            data: Value::Null,
            timestamp,
            game_id: game_id.to_owned(),
            phase,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (EventCallback, Arc<Mutex<Vec<SanitizedEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: EventCallback = Box::new(move |event| sink.lock().unwrap().push(event.clone()));
        (callback, seen)
    }

    #[test]
    fn s1_active_tick_emits_game_then_stats_both_on_all() {
        let mut pipeline = SanitizationPipeline::new();
        let (all_cb, all_seen) = recorder();
        pipeline.on_event(Channel::All, all_cb);

        let raw = json!({
            "event_type": "gameStateUpdate",
            "data": {
                "gameId": "G1", "active": true, "rugged": false, "price": 1.5,
                "tickCount": 50, "cooldownTimer": 0, "connectedPlayers": 172,
                "averageMultiplier": 15.037, "count2x": 52, "count10x": 9,
                "count50x": 1, "count100x": 1,
                "provablyFair": { "serverSeedHash": "abc", "version": "v3" },
                "leaderboard": [],
            },
        });

        let events = pipeline.process_raw(&raw);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].channel, Channel::Game);
        assert_eq!(events[1].channel, Channel::Stats);
        assert_eq!(events[0].phase, Phase::Active);
        assert_eq!(events[0].data["has_god_candle"], json!(false));
        assert_eq!(events[1].data["connected_players"], json!(172));
        assert!((events[1].data["average_multiplier"].as_f64().unwrap() - 15.037).abs() < 1e-9);

        let all_events = all_seen.lock().unwrap();
        assert_eq!(all_events.len(), 2);
    }

    #[test]
    fn s2_rug_transition_reveals_seed() {
        let mut pipeline = SanitizationPipeline::new();
        pipeline.process_raw(&json!({
            "event_type": "gameStateUpdate",
            "data": { "gameId": "G1", "active": true, "rugged": false },
        }));

        let events = pipeline.process_raw(&json!({
            "event_type": "gameStateUpdate",
            "data": {
                "gameId": "G1", "rugged": true,
                "provablyFair": { "serverSeedHash": "abc", "serverSeed": "revealed_seed" },
            },
        }));

        assert_eq!(events[0].phase, Phase::Rugged);
        assert_eq!(pipeline.phase_detector().stats().rug_count, 1);
    }

    #[test]
    fn s3_new_game_id_transitions_to_cooldown() {
        let mut pipeline = SanitizationPipeline::new();
        pipeline.process_raw(&json!({
            "event_type": "gameStateUpdate",
            "data": { "gameId": "G1", "active": true },
        }));
        pipeline.process_raw(&json!({
            "event_type": "gameStateUpdate",
            "data": { "gameId": "G1", "rugged": true },
        }));

        let events = pipeline.process_raw(&json!({
            "event_type": "gameStateUpdate",
            "data": { "gameId": "G2", "cooldownTimer": 15000, "allowPreRoundBuys": false },
        }));

        assert_eq!(events[0].phase, Phase::Cooldown);
        assert_eq!(pipeline.phase_detector().stats().games_seen, 1);
        assert_eq!(pipeline.phase_detector().current_game_id(), "G2");
    }

    #[test]
    fn s4_stale_god_candle_is_suppressed_on_second_tick() {
        let mut pipeline = SanitizationPipeline::new();
        let data = json!({
            "event_type": "gameStateUpdate",
            "data": {
                "gameId": "G1", "rugged": true,
                "highestToday": 55.3, "godCandle2x": 15.5, "godCandle2xGameId": "gc-A",
            },
        });

        let first = pipeline.process_raw(&data);
        assert_eq!(first[0].data["has_god_candle"], json!(true));

        let second = pipeline.process_raw(&data);
        assert_eq!(second[0].data["has_god_candle"], json!(false));
    }

    #[test]
    fn s5_sell_during_rug_is_a_forced_sell() {
        let mut pipeline = SanitizationPipeline::new();
        pipeline.process_raw(&json!({
            "event_type": "gameStateUpdate",
            "data": { "gameId": "G1", "active": true },
        }));
        pipeline.process_raw(&json!({
            "event_type": "gameStateUpdate",
            "data": { "gameId": "G1", "rugged": true },
        }));

        let events = pipeline.process_raw(&json!({
            "event_type": "standard/newTrade",
            "data": {
                "id": "t1", "gameId": "G1", "playerId": "p1",
                "type": "sell", "bonusPortion": 0, "realPortion": 0.1,
            },
        }));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, Channel::Trades);
        assert_eq!(events[0].data["is_forced_sell"], json!(true));
        assert_eq!(events[0].data["token_type"], json!("real"));
        assert_eq!(events[0].data["is_practice"], json!(false));
    }

    #[test]
    fn unknown_event_type_is_counted_and_dropped() {
        let mut pipeline = SanitizationPipeline::new();
        let events = pipeline.process_raw(&json!({ "event_type": "some/other", "data": { "a": 1 } }));
        assert!(events.is_empty());
        assert_eq!(pipeline.stats().other_events, 1);
    }

    #[test]
    fn empty_data_and_missing_type_are_counted_without_crashing() {
        let mut pipeline = SanitizationPipeline::new();
        assert!(pipeline.process_raw(&json!({ "event_type": "gameStateUpdate", "data": {} })).is_empty());
        assert!(pipeline.process_raw(&json!({ "data": { "a": 1 } })).is_empty());
        assert_eq!(pipeline.stats().empty_events, 2);
    }
}
