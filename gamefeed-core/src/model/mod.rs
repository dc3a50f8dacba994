//! Typed envelopes for game state, stats, trades, history, and the output wire format.
//!
//! Every constructor in this module is a tolerant `from_raw` over a loosely-typed
//! [`serde_json::Value`]: a missing or `null` field coalesces to a documented default rather
//! than aborting the parse. Only a whole-message JSON parse failure is a real error (see
//! [`crate::pipeline::SanitizationPipeline`]).

mod common;
mod event;
mod game;
mod history;
mod phase;
mod stats;
mod trade;

/// Tolerant accessors over a loosely-typed [`serde_json::Value`] object.
pub mod raw;

pub use common::{LeaderboardEntry, PartialPrices, ProvablyFair, Rugpool, ShortPosition, SideBet};
pub use event::SanitizedEvent;
pub use game::{DailyRecords, GameTick, GodCandleTier};
pub use history::{GameHistoryProvablyFair, GameHistoryRecord, GlobalSidebetEntry};
pub use phase::{Channel, Phase, TradeType, UnknownChannel};
pub use stats::SessionStats;
pub use trade::Trade;
