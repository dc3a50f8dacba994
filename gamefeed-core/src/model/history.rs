use super::raw;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Revealed provably-fair data for a completed game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameHistoryProvablyFair {
    pub server_seed: String,
    pub server_seed_hash: String,
}

/// A sidebet record from `gameHistory[].globalSidebets`. `type` distinguishes `placed` from
/// `payout`; the remaining optional fields are populated according to which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSidebetEntry {
    pub id: String,
    pub player_id: String,
    pub username: String,
    pub game_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub bet_amount: f64,
    pub x_payout: i64,
    pub coin_address: String,
    pub bonus_portion: f64,
    pub real_portion: f64,
    pub timestamp: i64,
    pub started_at_tick: Option<i64>,
    pub end: Option<i64>,
    pub payout: Option<f64>,
    pub profit: Option<f64>,
    pub end_tick: Option<i64>,
    pub start_tick: Option<i64>,
    pub tick_index: Option<i64>,
}

impl GlobalSidebetEntry {
    pub fn from_raw(raw_entry: &Value) -> Self {
        Self {
            id: raw::str_or(raw_entry, "id", ""),
            player_id: raw::str_or(raw_entry, "playerId", ""),
            username: raw::str_or(raw_entry, "username", ""),
            game_id: raw::str_or(raw_entry, "gameId", ""),
            kind: raw::str_or(raw_entry, "type", ""),
            bet_amount: raw::f64_or(raw_entry, "betAmount", 0.0),
            x_payout: raw::i64_or(raw_entry, "xPayout", 5),
            coin_address: raw::str_or(raw_entry, "coinAddress", ""),
            bonus_portion: raw::f64_or(raw_entry, "bonusPortion", 0.0),
            real_portion: raw::f64_or(raw_entry, "realPortion", 0.0),
            timestamp: raw::i64_or(raw_entry, "timestamp", 0),
            started_at_tick: raw::i64_opt(raw_entry, "startedAtTick"),
            end: raw::i64_opt(raw_entry, "end"),
            payout: raw::f64_opt(raw_entry, "payout"),
            profit: raw::f64_opt(raw_entry, "profit"),
            end_tick: raw::i64_opt(raw_entry, "endTick"),
            start_tick: raw::i64_opt(raw_entry, "startTick"),
            tick_index: raw::i64_opt(raw_entry, "tickIndex"),
        }
    }
}

/// A completed-game record exported from the upstream's rolling `gameHistory` window,
/// broadcast on the `history` channel. `global_trades` is always normalized to empty: the
/// public upstream never populates it, but implementations must accept a null or present array
/// either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameHistoryRecord {
    pub id: String,
    pub timestamp: i64,
    pub peak_multiplier: f64,
    pub rugged: bool,
    pub game_version: String,
    pub prices: Vec<f64>,
    pub global_trades: Vec<Value>,
    pub global_sidebets: Vec<GlobalSidebetEntry>,
    pub provably_fair: GameHistoryProvablyFair,
}

impl GameHistoryRecord {
    pub fn from_raw(raw_entry: &Value) -> Self {
        let pf = raw::obj(raw_entry, "provablyFair");
        Self {
            id: raw::str_or(raw_entry, "id", ""),
            timestamp: raw::i64_or(raw_entry, "timestamp", 0),
            peak_multiplier: raw::f64_or(raw_entry, "peakMultiplier", 0.0),
            rugged: raw::bool_or(raw_entry, "rugged", true),
            game_version: raw::str_or(raw_entry, "gameVersion", "v3"),
            prices: raw::array(raw_entry, "prices")
                .iter()
                .filter_map(Value::as_f64)
                .collect(),
            global_trades: Vec::new(),
            global_sidebets: raw::array(raw_entry, "globalSidebets")
                .iter()
                .map(GlobalSidebetEntry::from_raw)
                .collect(),
            provably_fair: GameHistoryProvablyFair {
                server_seed: pf.map(|v| raw::str_or(v, "serverSeed", "")).unwrap_or_default(),
                server_seed_hash: pf
                    .map(|v| raw::str_or(v, "serverSeedHash", ""))
                    .unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn game_history_record_normalizes_global_trades_to_empty() {
        let raw = json!({
            "id": "G1",
            "timestamp": 1_700_000_000_000i64,
            "peakMultiplier": 12.5,
            "prices": [1.0, 1.5, 2.0],
            "globalTrades": [{ "bogus": true }],
            "provablyFair": { "serverSeed": "seed", "serverSeedHash": "hash" },
        });
        let record = GameHistoryRecord::from_raw(&raw);
        assert!(record.global_trades.is_empty());
        assert_eq!(record.prices, vec![1.0, 1.5, 2.0]);
        assert_eq!(record.provably_fair.server_seed, "seed");
    }

    #[test]
    fn game_history_record_defaults_rugged_true() {
        let raw = json!({ "id": "G2" });
        let record = GameHistoryRecord::from_raw(&raw);
        assert!(record.rugged);
        assert_eq!(record.game_version, "v3");
    }
}
