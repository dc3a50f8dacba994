use serde::{Deserialize, Serialize};
use std::fmt;

/// Game phase derived from `gameStateUpdate` fields.
///
/// Detection priority (see [`crate::phase_detector::PhaseDetector::detect`]):
/// 1. `active=true` and `rugged=false` -> [`Phase::Active`]
/// 2. `rugged=true` -> [`Phase::Rugged`]
/// 3. `cooldown_timer > 0` and `allow_pre_round_buys` -> [`Phase::Presale`]
/// 4. `cooldown_timer > 0` -> [`Phase::Cooldown`]
/// 5. `allow_pre_round_buys=true` -> [`Phase::Presale`] (near-zero timer edge)
/// 6. otherwise -> [`Phase::Unknown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "RUGGED")]
    Rugged,
    #[serde(rename = "PRESALE")]
    Presale,
    #[serde(rename = "COOLDOWN")]
    Cooldown,
    #[serde(rename = "UNKNOWN")]
    #[default]
    Unknown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Active => "ACTIVE",
            Phase::Rugged => "RUGGED",
            Phase::Presale => "PRESALE",
            Phase::Cooldown => "COOLDOWN",
            Phase::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Trade action type from `standard/newTrade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeType {
    #[serde(rename = "buy")]
    Buy,
    #[serde(rename = "sell")]
    Sell,
    #[serde(rename = "short_open")]
    ShortOpen,
    #[serde(rename = "short_close")]
    ShortClose,
}

impl TradeType {
    /// Parse a wire trade type string, defaulting to `Buy` for anything unrecognised or
    /// missing — the upstream never omits this field for a real trade, but a malformed payload
    /// should not abort the whole trade record.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("sell") => TradeType::Sell,
            Some("short_open") => TradeType::ShortOpen,
            Some("short_close") => TradeType::ShortClose,
            _ => TradeType::Buy,
        }
    }
}

/// Output broadcast channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "game")]
    Game,
    #[serde(rename = "stats")]
    Stats,
    #[serde(rename = "trades")]
    Trades,
    #[serde(rename = "history")]
    History,
    #[serde(rename = "all")]
    All,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl Channel {
    pub const PRIMARY: [Channel; 4] = [
        Channel::Game,
        Channel::Stats,
        Channel::Trades,
        Channel::History,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Game => "game",
            Channel::Stats => "stats",
            Channel::Trades => "trades",
            Channel::History => "history",
            Channel::All => "all",
        }
    }

    /// Parse a channel name as supplied by a subscriber (eg/ a URL path segment). Unknown
    /// names are rejected rather than coalesced, since a subscriber's channel choice determines
    /// which broadcast set it joins.
    pub fn parse(name: &str) -> Result<Self, UnknownChannel> {
        match name {
            "game" => Ok(Channel::Game),
            "stats" => Ok(Channel::Stats),
            "trades" => Ok(Channel::Trades),
            "history" => Ok(Channel::History),
            "all" => Ok(Channel::All),
            other => Err(UnknownChannel(other.to_owned())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
