use super::common::{LeaderboardEntry, PartialPrices, ProvablyFair, Rugpool};
use super::phase::Phase;
use super::raw;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A single god-candle tier record (2x, 10x, or 50x). Non-null `multiplier` marks the tier as
/// populated for this tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GodCandleTier {
    pub multiplier: Option<f64>,
    pub timestamp: Option<i64>,
    pub game_id: Option<String>,
    pub server_seed: Option<String>,
    /// `[jump_multiplier, resulting_price]`.
    pub massive_jump: Option<(f64, f64)>,
}

impl GodCandleTier {
    fn from_raw(data: &Value, prefix: &str) -> Self {
        let timestamp_key = format!("{prefix}Timestamp");
        let game_id_key = format!("{prefix}GameId");
        let seed_key = format!("{prefix}ServerSeed");
        let jump_key = format!("{prefix}MassiveJump");

        let massive_jump = raw::obj(data, &jump_key)
            .and_then(Value::as_array)
            .and_then(|arr| match arr.as_slice() {
                [a, b, ..] => Some((a.as_f64()?, b.as_f64()?)),
                _ => None,
            });

        Self {
            multiplier: raw::f64_opt(data, prefix),
            timestamp: raw::i64_opt(data, &timestamp_key),
            game_id: raw::str_opt(data, &game_id_key),
            server_seed: raw::str_opt(data, &seed_key),
            massive_jump,
        }
    }
}

/// Daily records and god-candle tracking, relayed on rare transition ticks.
///
/// Invariant: the `game_id` of any populated tier is the stable key a
/// [`crate::god_candle::GodCandleDetector`] uses for newness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRecords {
    pub highest_today: Option<f64>,
    pub highest_today_timestamp: Option<i64>,
    pub highest_today_game_id: Option<String>,
    pub highest_today_server_seed: Option<String>,
    pub god_candle_2x: GodCandleTier,
    pub god_candle_10x: GodCandleTier,
    pub god_candle_50x: GodCandleTier,
}

impl DailyRecords {
    pub fn from_raw(data: &Value) -> Self {
        Self {
            highest_today: raw::f64_opt(data, "highestToday"),
            highest_today_timestamp: raw::i64_opt(data, "highestTodayTimestamp"),
            highest_today_game_id: raw::str_opt(data, "highestTodayGameId"),
            highest_today_server_seed: raw::str_opt(data, "highestTodayServerSeed"),
            god_candle_2x: GodCandleTier::from_raw(data, "godCandle2x"),
            god_candle_10x: GodCandleTier::from_raw(data, "godCandle10x"),
            god_candle_50x: GodCandleTier::from_raw(data, "godCandle50x"),
        }
    }

    fn tiers(&self) -> [&GodCandleTier; 3] {
        [&self.god_candle_2x, &self.god_candle_10x, &self.god_candle_50x]
    }

    /// Stateless check: true if any tier is populated. Because the upstream re-reports stale
    /// god-candle data on every transition tick for the rest of the UTC day, this is NOT the
    /// signal `GameTick.has_god_candle` should carry; see [`crate::god_candle::GodCandleDetector`]
    /// for the edge-triggered version.
    pub fn has_god_candle(&self) -> bool {
        self.tiers().into_iter().any(|t| t.multiplier.is_some())
    }

    /// The set of non-null god-candle game ids across all tiers.
    pub fn god_candle_game_ids(&self) -> HashSet<String> {
        self.tiers()
            .into_iter()
            .filter_map(|t| t.game_id.clone())
            .collect()
    }
}

/// Core game state from `gameStateUpdate`, broadcast on the `game` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameTick {
    pub game_id: String,
    pub phase: Phase,
    pub active: bool,
    pub price: f64,
    pub rugged: bool,
    pub tick_count: i64,
    pub trade_count: Option<i64>,
    pub cooldown_timer: i64,
    pub cooldown_paused: bool,
    pub allow_pre_round_buys: bool,
    pub partial_prices: Option<PartialPrices>,
    pub provably_fair: Option<ProvablyFair>,
    pub rugpool: Option<Rugpool>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub game_version: Option<String>,
    /// Only present on the rare transition ticks (~0.5%) where the upstream relays daily
    /// records at all.
    pub daily_records: Option<DailyRecords>,
    /// Edge-triggered flag: true only when [`crate::god_candle::GodCandleDetector`] determines
    /// this tick introduces a god-candle game id it hasn't seen before. Never the raw presence
    /// of a populated tier (see [`DailyRecords::has_god_candle`]).
    pub has_god_candle: bool,
}

impl GameTick {
    /// Build a `GameTick` from raw `gameStateUpdate` data with an already-classified phase.
    /// `has_god_candle` starts as the stateless presence check; the pipeline overwrites it with
    /// the god-candle detector's edge-triggered result before emitting.
    pub fn from_raw(data: &Value, phase: Phase) -> Self {
        let daily_records = if raw::obj(data, "highestToday").is_some() {
            Some(DailyRecords::from_raw(data))
        } else {
            None
        };
        let has_god_candle = daily_records
            .as_ref()
            .map(DailyRecords::has_god_candle)
            .unwrap_or(false);

        Self {
            game_id: raw::str_or(data, "gameId", ""),
            phase,
            active: raw::bool_or(data, "active", false),
            price: raw::f64_or(data, "price", 1.0),
            rugged: raw::bool_or(data, "rugged", false),
            tick_count: raw::i64_or(data, "tickCount", 0),
            trade_count: raw::i64_opt(data, "tradeCount"),
            cooldown_timer: raw::i64_or(data, "cooldownTimer", 0),
            cooldown_paused: raw::bool_or(data, "cooldownPaused", false),
            allow_pre_round_buys: raw::bool_or(data, "allowPreRoundBuys", false),
            partial_prices: PartialPrices::from_raw(raw::obj(data, "partialPrices")),
            provably_fair: ProvablyFair::from_raw(raw::obj(data, "provablyFair")),
            rugpool: Rugpool::from_raw(raw::obj(data, "rugpool")),
            leaderboard: raw::array(data, "leaderboard")
                .iter()
                .map(LeaderboardEntry::from_raw)
                .collect(),
            game_version: raw::str_opt(data, "gameVersion"),
            daily_records,
            has_god_candle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn game_tick_defaults_price_to_one() {
        let raw = json!({ "gameId": "G1" });
        let tick = GameTick::from_raw(&raw, Phase::Unknown);
        assert_eq!(tick.price, 1.0);
        assert!(!tick.has_god_candle);
        assert!(tick.daily_records.is_none());
    }

    #[test]
    fn daily_records_parses_god_candle_tiers() {
        let raw = json!({
            "highestToday": 1122.278,
            "godCandle2x": 15.5,
            "godCandle2xTimestamp": 1_770_346_598_019i64,
            "godCandle2xGameId": "20260206-43cb",
            "godCandle2xServerSeed": "bfb75645",
            "godCandle2xMassiveJump": [10.0, 15.5],
            "godCandle10x": null,
            "godCandle50x": null,
        });
        let tick = GameTick::from_raw(&raw, Phase::Rugged);
        let daily = tick.daily_records.expect("daily records present");
        assert_eq!(daily.highest_today, Some(1122.278));
        assert_eq!(daily.god_candle_2x.multiplier, Some(15.5));
        assert_eq!(daily.god_candle_2x.massive_jump, Some((10.0, 15.5)));
        assert!(daily.god_candle_10x.multiplier.is_none());
        assert!(tick.has_god_candle);
        assert_eq!(
            daily.god_candle_game_ids(),
            ["20260206-43cb".to_string()].into_iter().collect()
        );
    }
}
