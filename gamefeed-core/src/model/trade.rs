use super::phase::TradeType;
use super::raw;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inferred token classification for a trade, derived from its bonus/real portion split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Practice,
    Real,
    #[default]
    Unknown,
}

/// Annotated trade from `standard/newTrade`, broadcast on the `trades` channel.
///
/// Core fields are parsed verbatim from the wire; the four `is_*`/`token_type` fields start at
/// their defaults here and are filled in by [`crate::trade_annotator::TradeAnnotator::annotate`]
/// — see that module for the classification rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub game_id: String,
    pub player_id: String,
    pub username: String,
    pub level: i64,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: TradeType,
    pub tick_index: i64,
    pub coin: String,
    pub amount: f64,
    pub qty: f64,
    pub leverage: Option<i64>,
    pub bonus_portion: Option<f64>,
    pub real_portion: Option<f64>,

    pub is_forced_sell: bool,
    pub is_liquidation: bool,
    pub is_practice: bool,
    pub token_type: TokenType,
}

impl Trade {
    pub fn from_raw(data: &Value) -> Self {
        Self {
            id: raw::str_or(data, "id", ""),
            game_id: raw::str_or(data, "gameId", ""),
            player_id: raw::str_or(data, "playerId", ""),
            username: raw::str_or(data, "username", ""),
            level: raw::i64_or(data, "level", 0),
            price: raw::f64_or(data, "price", 0.0),
            kind: TradeType::from_wire(raw::obj(data, "type").and_then(Value::as_str)),
            tick_index: raw::i64_or(data, "tickIndex", 0),
            coin: raw::str_or(data, "coin", "solana"),
            amount: raw::f64_or(data, "amount", 0.0),
            qty: raw::f64_or(data, "qty", 0.0),
            leverage: raw::i64_opt(data, "leverage"),
            bonus_portion: raw::f64_opt(data, "bonusPortion"),
            real_portion: raw::f64_opt(data, "realPortion"),
            is_forced_sell: false,
            is_liquidation: false,
            is_practice: false,
            token_type: TokenType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trade_from_raw_defaults_coin_to_solana() {
        let raw = json!({
            "id": "t1",
            "gameId": "G1",
            "playerId": "p1",
            "type": "sell",
            "bonusPortion": 0,
            "realPortion": 0.1,
        });
        let trade = Trade::from_raw(&raw);
        assert_eq!(trade.coin, "solana");
        assert_eq!(trade.kind, TradeType::Sell);
        assert!(!trade.is_forced_sell);
        assert_eq!(trade.token_type, TokenType::Unknown);
    }
}
