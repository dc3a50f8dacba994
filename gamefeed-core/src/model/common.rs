use super::raw;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Current candlestick data (5 ticks = 1.25s candle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialPrices {
    pub start_tick: i64,
    pub end_tick: i64,
    pub values: HashMap<String, f64>,
}

impl PartialPrices {
    pub fn from_raw(raw: Option<&Value>) -> Option<Self> {
        let raw = raw?;
        let values = raw
            .get("values")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)))
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            start_tick: super::raw::i64_or(raw, "startTick", 0),
            end_tick: super::raw::i64_or(raw, "endTick", 0),
            values,
        })
    }
}

/// Provably fair triplet data. `server_seed` is only present after a rug (the first
/// rug-transition broadcast).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvablyFair {
    pub server_seed_hash: String,
    pub version: String,
    pub server_seed: Option<String>,
}

impl ProvablyFair {
    pub fn from_raw(raw: Option<&Value>) -> Option<Self> {
        let raw = raw?;
        Some(Self {
            server_seed_hash: super::raw::str_or(raw, "serverSeedHash", ""),
            version: super::raw::str_or(raw, "version", "v3"),
            server_seed: super::raw::str_opt(raw, "serverSeed"),
        })
    }
}

/// Rugpool consolation prize state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rugpool {
    pub instarug_count: i64,
    pub threshold: i64,
    pub rugpool_amount: f64,
}

impl Rugpool {
    pub fn from_raw(raw: Option<&Value>) -> Option<Self> {
        let raw = raw?;
        Some(Self {
            instarug_count: super::raw::i64_or(raw, "instarugCount", 0),
            threshold: super::raw::i64_or(raw, "threshold", 10),
            rugpool_amount: super::raw::f64_or(raw, "rugpoolAmount", 0.0),
        })
    }
}

/// Active sidebet details: a 40-tick hardcoded window, 5x fixed payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideBet {
    pub started_at_tick: i64,
    pub game_id: String,
    pub end: i64,
    pub bet_amount: f64,
    pub x_payout: i64,
    pub coin_address: String,
    pub bonus_portion: f64,
    pub real_portion: f64,
}

impl SideBet {
    pub fn from_raw(raw: Option<&Value>) -> Option<Self> {
        let raw = raw?;
        Some(Self {
            started_at_tick: super::raw::i64_or(raw, "startedAtTick", 0),
            game_id: super::raw::str_or(raw, "gameId", ""),
            end: super::raw::i64_or(raw, "end", 0),
            bet_amount: super::raw::f64_or(raw, "betAmount", 0.0),
            x_payout: super::raw::i64_or(raw, "xPayout", 5),
            coin_address: super::raw::str_or(raw, "coinAddress", ""),
            bonus_portion: super::raw::f64_or(raw, "bonusPortion", 0.0),
            real_portion: super::raw::f64_or(raw, "realPortion", 0.0),
        })
    }
}

/// Active short position details. PnL formula is tentative upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortPosition {
    pub amount: f64,
    pub entry_price: f64,
    pub entry_tick: i64,
    pub current_value: f64,
    pub pnl: f64,
    pub coin_address: String,
    pub bonus_portion: f64,
    pub real_portion: f64,
}

impl ShortPosition {
    pub fn from_raw(raw: Option<&Value>) -> Option<Self> {
        let raw = raw?;
        Some(Self {
            amount: super::raw::f64_or(raw, "amount", 0.0),
            entry_price: super::raw::f64_or(raw, "entryPrice", 0.0),
            entry_tick: super::raw::i64_or(raw, "entryTick", 0),
            current_value: super::raw::f64_or(raw, "currentValue", 0.0),
            pnl: super::raw::f64_or(raw, "pnl", 0.0),
            coin_address: super::raw::str_or(raw, "coinAddress", ""),
            bonus_portion: super::raw::f64_or(raw, "bonusPortion", 0.0),
            real_portion: super::raw::f64_or(raw, "realPortion", 0.0),
        })
    }
}

/// Single leaderboard entry (top 10 by PnL). Several fields are tentative upstream
/// (`avg_cost`, `total_invested`, the short PnL formula).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub username: String,
    pub level: i64,
    pub pnl: f64,
    pub regular_pnl: f64,
    pub sidebet_pnl: f64,
    pub short_pnl: f64,
    pub pnl_percent: f64,
    pub has_active_trades: bool,
    pub position_qty: f64,
    pub avg_cost: f64,
    pub total_invested: f64,
    pub position: i64,
    pub selected_coin: Option<Value>,
    pub sidebet_active: Option<bool>,
    pub side_bet: Option<SideBet>,
    pub short_position: Option<ShortPosition>,
}

impl LeaderboardEntry {
    /// Whether this player is using practice tokens, derived from `selected_coin.address`.
    pub fn is_practice(&self) -> bool {
        self.selected_coin
            .as_ref()
            .and_then(|c| c.get("address"))
            .and_then(Value::as_str)
            == Some("0xPractice")
    }

    pub fn from_raw(raw: &Value) -> Self {
        Self {
            id: raw::str_or(raw, "id", ""),
            username: raw::str_or(raw, "username", ""),
            level: raw::i64_or(raw, "level", 0),
            pnl: raw::f64_or(raw, "pnl", 0.0),
            regular_pnl: raw::f64_or(raw, "regularPnl", 0.0),
            sidebet_pnl: raw::f64_or(raw, "sidebetPnl", 0.0),
            short_pnl: raw::f64_or(raw, "shortPnl", 0.0),
            pnl_percent: raw::f64_or(raw, "pnlPercent", 0.0),
            has_active_trades: raw::bool_or(raw, "hasActiveTrades", false),
            position_qty: raw::f64_or(raw, "positionQty", 0.0),
            avg_cost: raw::f64_or(raw, "avgCost", 0.0),
            total_invested: raw::f64_or(raw, "totalInvested", 0.0),
            position: raw::i64_or(raw, "position", 0),
            selected_coin: raw::obj(raw, "selectedCoin").cloned(),
            sidebet_active: raw::bool_opt(raw, "sidebetActive"),
            side_bet: SideBet::from_raw(raw.get("sideBet")),
            short_position: ShortPosition::from_raw(raw.get("shortPosition")),
        }
    }
}
