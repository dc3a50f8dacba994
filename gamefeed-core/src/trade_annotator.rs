//! Trade annotation: enriches `standard/newTrade` events with inferred fields.
//!
//! Forced sells and leverage liquidations are indistinguishable from voluntary sells on the
//! wire; this module infers them from the phase and the trade's bonus/real portion split.

use crate::model::raw;
use crate::model::{Phase, Trade, TradeType};
use serde_json::Value;
use std::collections::HashSet;

/// Sentinel practice-token address. The wire currently has exactly one practice token, but the
/// set below is tracked defensively in case that changes.
pub const PRACTICE_TOKEN_ADDRESS: &str = "0xPractice";

/// Stateless except for a set of known practice-token addresses. `token_type` classification is
/// driven purely by the bonus/real portion split (not by this set) — see
/// [`TradeAnnotator::annotate`].
#[derive(Debug, Clone)]
pub struct TradeAnnotator {
    practice_addresses: HashSet<String>,
}

impl Default for TradeAnnotator {
    fn default() -> Self {
        Self {
            practice_addresses: HashSet::from([PRACTICE_TOKEN_ADDRESS.to_owned()]),
        }
    }
}

impl TradeAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge addresses extracted from each entry's `address` field into the known
    /// practice-token set. A no-op if `available_shitcoins` is absent or empty.
    pub fn update_practice_tokens(&mut self, available_shitcoins: Option<&[Value]>) {
        let Some(coins) = available_shitcoins else {
            return;
        };
        for coin in coins {
            if let Some(addr) = raw::str_opt(coin, "address") {
                self.practice_addresses.insert(addr);
            }
        }
    }

    pub fn known_practice_addresses(&self) -> &HashSet<String> {
        &self.practice_addresses
    }

    /// Annotate `trade` in place with `token_type`, `is_practice`, `is_forced_sell`, and
    /// `is_liquidation`:
    /// - `token_type`: both portions null -> `unknown`; bonus-only -> `practice`; real-only, or
    ///   both present (position stacking) -> `real`; both zero -> `unknown`.
    /// - `is_practice` = `token_type == practice`.
    /// - `is_forced_sell` = a sell during the `RUGGED` phase.
    /// - `is_liquidation` is left `false`: inferring it needs the player's `avg_cost` from the
    ///   leaderboard, which this annotator does not have access to.
    pub fn annotate(&self, trade: &mut Trade, phase: Phase) {
        trade.token_type = classify_token(trade.bonus_portion, trade.real_portion);
        trade.is_practice = trade.token_type == crate::model::TokenType::Practice;
        if trade.kind == TradeType::Sell && phase == Phase::Rugged {
            trade.is_forced_sell = true;
        }
    }
}

fn classify_token(
    bonus_portion: Option<f64>,
    real_portion: Option<f64>,
) -> crate::model::TokenType {
    use crate::model::TokenType;

    if bonus_portion.is_none() && real_portion.is_none() {
        return TokenType::Unknown;
    }

    let bonus = bonus_portion.unwrap_or(0.0);
    let real = real_portion.unwrap_or(0.0);

    if bonus > 0.0 && real == 0.0 {
        TokenType::Practice
    } else if real > 0.0 {
        // Covers both real-only and mixed (position stacking) cases.
        TokenType::Real
    } else {
        TokenType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenType;
    use serde_json::json;

    fn trade(bonus: Option<f64>, real: Option<f64>, kind: TradeType) -> Trade {
        let mut t = Trade::from_raw(&json!({ "id": "t1", "gameId": "G1" }));
        t.bonus_portion = bonus;
        t.real_portion = real;
        t.kind = kind;
        t
    }

    #[test]
    fn classify_null_both_is_unknown() {
        assert_eq!(classify_token(None, None), TokenType::Unknown);
    }

    #[test]
    fn classify_bonus_only_is_practice() {
        assert_eq!(classify_token(Some(0.5), Some(0.0)), TokenType::Practice);
    }

    #[test]
    fn classify_real_only_is_real() {
        assert_eq!(classify_token(Some(0.0), Some(0.5)), TokenType::Real);
    }

    #[test]
    fn classify_both_positive_is_real_position_stacking() {
        assert_eq!(classify_token(Some(0.3), Some(0.3)), TokenType::Real);
    }

    #[test]
    fn classify_both_zero_is_unknown() {
        assert_eq!(classify_token(Some(0.0), Some(0.0)), TokenType::Unknown);
    }

    #[test]
    fn forced_sell_requires_sell_and_rugged_phase() {
        let annotator = TradeAnnotator::new();
        let mut t = trade(Some(0.0), Some(0.1), TradeType::Sell);
        annotator.annotate(&mut t, Phase::Rugged);
        assert!(t.is_forced_sell);
        assert_eq!(t.token_type, TokenType::Real);
        assert!(!t.is_practice);

        let mut buy = trade(Some(0.0), Some(0.1), TradeType::Buy);
        annotator.annotate(&mut buy, Phase::Rugged);
        assert!(!buy.is_forced_sell, "buys are never forced sells");

        let mut active_sell = trade(Some(0.0), Some(0.1), TradeType::Sell);
        annotator.annotate(&mut active_sell, Phase::Active);
        assert!(!active_sell.is_forced_sell, "only RUGGED phase sells are forced");
    }

    #[test]
    fn update_practice_tokens_merges_addresses() {
        let mut annotator = TradeAnnotator::new();
        annotator.update_practice_tokens(Some(&[json!({ "address": "0xExtra" })]));
        assert!(annotator
            .known_practice_addresses()
            .contains("0xExtra"));
        assert!(annotator
            .known_practice_addresses()
            .contains(PRACTICE_TOKEN_ADDRESS));
    }
}
