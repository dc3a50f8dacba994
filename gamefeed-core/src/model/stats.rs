use super::raw;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-computed aggregate statistics from `gameStateUpdate`, broadcast on the `stats`
/// channel. Updates only at game boundaries except `connected_players`, which updates
/// continuously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub connected_players: i64,
    pub average_multiplier: Option<f64>,
    pub count_2x: Option<i64>,
    pub count_10x: Option<i64>,
    pub count_50x: Option<i64>,
    pub count_100x: Option<i64>,
}

impl SessionStats {
    pub fn from_raw(data: &Value) -> Self {
        Self {
            connected_players: raw::i64_or(data, "connectedPlayers", 0),
            average_multiplier: raw::f64_opt(data, "averageMultiplier"),
            count_2x: raw::i64_opt(data, "count2x"),
            count_10x: raw::i64_opt(data, "count10x"),
            count_50x: raw::i64_opt(data, "count50x"),
            count_100x: raw::i64_opt(data, "count100x"),
        }
    }
}
