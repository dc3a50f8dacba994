//! God-candle change-detection.
//!
//! The upstream re-reports stale god-candle data on every transition tick for the rest of the
//! UTC day after one occurs. This detector tracks previously seen god-candle game ids and only
//! flags a *new* god candle when an unseen game id appears in the daily records.

use crate::model::DailyRecords;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GodCandleStats {
    pub new_detections: u64,
    pub tracked_game_ids: usize,
}

/// Owns the set of god-candle game ids seen so far. Unbounded within a session, matching the
/// upstream original (which never evicts); see [`crate::history_collector`] in the root crate
/// for the capped variant used to dedup history records.
#[derive(Debug, Clone, Default)]
pub struct GodCandleDetector {
    seen_game_ids: HashSet<String>,
    new_detections: u64,
}

impl GodCandleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only if `daily` contains at least one god-candle game id not previously
    /// seen; `false` for `None`, an unpopulated record, or a repeat of already-seen ids.
    pub fn check(&mut self, daily: Option<&DailyRecords>) -> bool {
        let Some(daily) = daily else {
            return false;
        };
        if !daily.has_god_candle() {
            return false;
        }

        let current_ids = daily.god_candle_game_ids();
        let new_ids: HashSet<String> = current_ids
            .difference(&self.seen_game_ids)
            .cloned()
            .collect();

        if new_ids.is_empty() {
            return false;
        }

        for game_id in &new_ids {
            info!(game_id, "new god candle detected");
        }
        self.seen_game_ids.extend(new_ids);
        self.new_detections += 1;
        true
    }

    pub fn stats(&self) -> GodCandleStats {
        GodCandleStats {
            new_detections: self.new_detections,
            tracked_game_ids: self.seen_game_ids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GameTick;
    use crate::model::Phase;
    use serde_json::json;

    fn daily_with_tier(game_id: &str) -> DailyRecords {
        let data = json!({
            "highestToday": 55.3,
            "godCandle2x": 15.5,
            "godCandle2xGameId": game_id,
        });
        GameTick::from_raw(&data, Phase::Rugged)
            .daily_records
            .expect("populated daily records")
    }

    #[test]
    fn none_and_empty_input_return_false() {
        let mut detector = GodCandleDetector::new();
        assert!(!detector.check(None));

        let empty = DailyRecords {
            highest_today: Some(55.3),
            ..Default::default()
        };
        assert!(!detector.check(Some(&empty)));
    }

    #[test]
    fn stale_repeats_are_suppressed_after_first_sighting() {
        let mut detector = GodCandleDetector::new();
        let daily = daily_with_tier("gc-A");

        assert!(detector.check(Some(&daily)), "first sighting is new");
        assert!(!detector.check(Some(&daily)), "repeat of same tick is stale");
        assert_eq!(detector.stats().new_detections, 1);
        assert_eq!(detector.stats().tracked_game_ids, 1);
    }

    #[test]
    fn distinct_game_ids_each_flag_once() {
        let mut detector = GodCandleDetector::new();
        assert!(detector.check(Some(&daily_with_tier("gc-A"))));
        assert!(detector.check(Some(&daily_with_tier("gc-B"))));
        assert!(!detector.check(Some(&daily_with_tier("gc-A"))));
        assert_eq!(detector.stats().new_detections, 2);
        assert_eq!(detector.stats().tracked_game_ids, 2);
    }
}
