//! Smart `gameHistory` collection: captures the upstream's rolling history window every Nth
//! rug, with a god-candle override forcing immediate capture. Directly grounded on the original
//! `history_collector.py`.
//!
//! Rosetta Stone Section 1.10: the rolling window contains exactly 10 games and shifts by 1 on
//! each completion, so capturing every 10th rug yields zero overlap.

use gamefeed_core::model::GameHistoryRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use tracing::{info, warn};

/// Oldest-first eviction cap for the dedup set. The original Python implementation relies on
/// incidental `set`/`dict` iteration order to find "the oldest" id; `HashSet` iteration order
/// in Rust is unspecified, so insertion order is tracked explicitly via `order` below.
const MAX_TRACKED_IDS: usize = 1000;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectorStats {
    pub rugs_seen: u64,
    pub collections_triggered: u64,
    pub records_collected: u64,
    pub god_candle_captures: u64,
    pub duplicates_skipped: u64,
    pub next_collection_in: u32,
    pub collection_interval: u32,
    pub tracked_ids: usize,
}

/// Counts rugged games and decides, per rug, whether to capture the upstream's `gameHistory`
/// window. Single-owner, driven from the same task as the sanitization pipeline.
#[derive(Debug)]
pub struct HistoryCollector {
    interval: u32,
    rugs_seen: u64,
    collections_triggered: u64,
    records_collected: u64,
    god_candle_captures: u64,
    duplicates_skipped: u64,
    captured_ids: HashSet<String>,
    capture_order: VecDeque<String>,
}

impl HistoryCollector {
    pub fn new(collection_interval: u32) -> Self {
        Self {
            interval: collection_interval.max(1),
            rugs_seen: 0,
            collections_triggered: 0,
            records_collected: 0,
            god_candle_captures: 0,
            duplicates_skipped: 0,
            captured_ids: HashSet::new(),
            capture_order: VecDeque::new(),
        }
    }

    pub fn rug_count(&self) -> u64 {
        self.rugs_seen
    }

    /// Rugs remaining until the next scheduled (non-god-candle) collection.
    pub fn next_collection_in(&self) -> u32 {
        self.interval - (self.rugs_seen as u32 % self.interval)
    }

    /// Called once per completed game. `game_history_raw` is the upstream's `gameHistory` array
    /// for this tick, if present; `has_god_candle` is the pipeline's edge-triggered flag for the
    /// same tick. Returns newly-collected, deduplicated records (possibly empty).
    pub fn on_rug(&mut self, game_history_raw: Option<&[Value]>, has_god_candle: bool) -> Vec<GameHistoryRecord> {
        self.rugs_seen += 1;

        let mut should_collect = self.rugs_seen % u64::from(self.interval) == 0;

        if has_god_candle {
            should_collect = true;
            self.god_candle_captures += 1;
            info!("god candle detected, forcing history collection");
        }

        if !should_collect {
            return Vec::new();
        }

        let Some(entries) = game_history_raw.filter(|e| !e.is_empty()) else {
            warn!("collection triggered but no gameHistory data present");
            return Vec::new();
        };

        self.collect(entries)
    }

    fn collect(&mut self, entries: &[Value]) -> Vec<GameHistoryRecord> {
        self.collections_triggered += 1;
        let mut records = Vec::new();

        for entry_raw in entries {
            let game_id = gamefeed_core::model::raw::str_or(entry_raw, "id", "");
            if game_id.is_empty() {
                continue;
            }

            if self.captured_ids.contains(&game_id) {
                self.duplicates_skipped += 1;
                continue;
            }

            self.captured_ids.insert(game_id.clone());
            self.capture_order.push_back(game_id.clone());
            if self.capture_order.len() > MAX_TRACKED_IDS {
                if let Some(oldest) = self.capture_order.pop_front() {
                    self.captured_ids.remove(&oldest);
                }
            }

            records.push(GameHistoryRecord::from_raw(entry_raw));
            self.records_collected += 1;
        }

        if !records.is_empty() {
            info!(
                collected = records.len(),
                rug = self.rugs_seen,
                total = self.records_collected,
                "collected history records"
            );
        }

        records
    }

    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            rugs_seen: self.rugs_seen,
            collections_triggered: self.collections_triggered,
            records_collected: self.records_collected,
            god_candle_captures: self.god_candle_captures,
            duplicates_skipped: self.duplicates_skipped,
            next_collection_in: self.next_collection_in(),
            collection_interval: self.interval,
            tracked_ids: self.captured_ids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history_with_id(id: &str) -> Vec<Value> {
        vec![json!({ "id": id, "timestamp": 1, "peakMultiplier": 2.0 })]
    }

    #[test]
    fn collects_every_nth_rug() {
        let mut collector = HistoryCollector::new(3);
        for i in 1..=2 {
            let records = collector.on_rug(Some(&history_with_id(&format!("g{i}"))), false);
            assert!(records.is_empty(), "rug {i} should not trigger collection");
        }
        let records = collector.on_rug(Some(&history_with_id("g3")), false);
        assert_eq!(records.len(), 1);
        assert_eq!(collector.stats().collections_triggered, 1);
    }

    #[test]
    fn god_candle_forces_immediate_collection() {
        let mut collector = HistoryCollector::new(10);
        let records = collector.on_rug(Some(&history_with_id("g1")), true);
        assert_eq!(records.len(), 1);
        assert_eq!(collector.stats().god_candle_captures, 1);
    }

    #[test]
    fn duplicate_game_ids_are_skipped() {
        let mut collector = HistoryCollector::new(1);
        collector.on_rug(Some(&history_with_id("g1")), false);
        let second = collector.on_rug(Some(&history_with_id("g1")), false);
        assert!(second.is_empty());
        assert_eq!(collector.stats().duplicates_skipped, 1);
    }

    #[test]
    fn missing_history_data_on_trigger_returns_empty() {
        let mut collector = HistoryCollector::new(1);
        let records = collector.on_rug(None, false);
        assert!(records.is_empty());
        assert_eq!(collector.stats().rugs_seen, 1);
    }

    #[test]
    fn oldest_entries_are_evicted_once_cap_is_exceeded() {
        let mut collector = HistoryCollector::new(1);
        for i in 0..MAX_TRACKED_IDS + 5 {
            collector.on_rug(Some(&history_with_id(&format!("g{i}"))), false);
        }
        assert_eq!(collector.stats().tracked_ids, MAX_TRACKED_IDS);
        assert!(!collector.captured_ids.contains("g0"), "oldest id should have been evicted");
        assert!(collector.captured_ids.contains(&format!("g{}", MAX_TRACKED_IDS + 4)));
    }
}
