//! End-to-end scenario tests spanning the sanitization pipeline and the channel broadcaster,
//! exercised only through public API (no internal access to either crate).

use gamefeed::broadcaster::ChannelBroadcaster;
use gamefeed_core::model::{Channel, SanitizedEvent};
use gamefeed_core::pipeline::SanitizationPipeline;
use gamefeed_integration::channel::mpsc_bounded;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

fn recorder() -> (
    gamefeed_core::pipeline::EventCallback,
    Arc<Mutex<Vec<SanitizedEvent>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: gamefeed_core::pipeline::EventCallback = Box::new(move |event| sink.lock().unwrap().push(event.clone()));
    (callback, seen)
}

#[test]
fn active_tick_emits_game_then_stats_both_on_all() {
    let mut pipeline = SanitizationPipeline::new();
    let (all_cb, all_seen) = recorder();
    pipeline.on_event(Channel::All, all_cb);

    let events = pipeline.process_raw(&json!({
        "event_type": "gameStateUpdate",
        "data": {
            "gameId": "G1", "active": true, "rugged": false, "price": 1.5,
            "tickCount": 50, "cooldownTimer": 0, "connectedPlayers": 172,
            "averageMultiplier": 15.037, "count2x": 52, "count10x": 9,
            "count50x": 1, "count100x": 1,
            "provablyFair": { "serverSeedHash": "abc", "version": "v3" },
            "leaderboard": [],
        },
    }));

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].channel, Channel::Game);
    assert_eq!(events[1].channel, Channel::Stats);
    assert_eq!(events[0].data["has_god_candle"], json!(false));
    assert_eq!(events[1].data["connected_players"], json!(172));
    assert_eq!(all_seen.lock().unwrap().len(), 2);
}

#[test]
fn rug_transition_reveals_seed_and_increments_rug_count() {
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

    assert_eq!(events[0].phase, gamefeed_core::model::Phase::Rugged);
    assert_eq!(pipeline.phase_detector().stats().rug_count, 1);
}

#[test]
fn new_game_id_after_rug_transitions_to_cooldown() {
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

    assert_eq!(events[0].phase, gamefeed_core::model::Phase::Cooldown);
    assert_eq!(pipeline.phase_detector().stats().games_seen, 1);
    assert_eq!(pipeline.phase_detector().current_game_id(), "G2");
}

#[test]
fn stale_god_candle_reports_suppressed_on_repeat_tick() {
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
    assert_eq!(pipeline.stats().god_candle.new_detections, 1);
}

#[test]
fn sell_trade_during_rug_is_flagged_as_forced() {
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
}

/// The broadcaster's own producer queue, not a per-subscriber channel, is what must never
/// block: per-subscriber sends are already non-blocking `try_send` calls, so a slow subscriber
/// only loses its own events, never stalls the fan-out loop or other subscribers. This exercises
/// that guarantee at the producer-queue boundary: a consumer that hasn't started draining yet is
/// indistinguishable, from the producer's perspective, from one that never will.
#[tokio::test]
async fn bounded_queue_overflow_drops_newest_and_later_delivers_the_retained_events() {
    let (broadcaster, queue_rx) = ChannelBroadcaster::new(4);

    let event = |n: u32| {
        SanitizedEvent::new(
            Channel::Game,
            "gameStateUpdate",
            json!({ "tick": n }),
            "G1",
            gamefeed_core::model::Phase::Active,
            chrono::Utc::now(),
        )
        .unwrap()
    };

    let (tx, mut rx) = mpsc_bounded(16);
    broadcaster.subscribe(Channel::Game, tx);

    for n in 0..7 {
        broadcaster.broadcast(event(n));
    }

    let stats = broadcaster.stats();
    assert_eq!(stats.total_dropped, 3, "3 of the 7 broadcasts should have been dropped at capacity 4");

    let shutdown = Arc::new(Notify::new());
    let run_handle = tokio::spawn(broadcaster.clone().run(queue_rx, shutdown.clone()));

    let mut delivered = Vec::new();
    for _ in 0..4 {
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        delivered.push(event.data["tick"].as_u64().unwrap());
    }
    assert_eq!(delivered, vec![0, 1, 2, 3], "the 4 retained events must arrive in broadcast order");

    shutdown.notify_one();
    run_handle.await.unwrap();
}
