use super::phase::{Channel, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output envelope wrapping all sanitized data — the wire format sent to downstream
/// subscribers. `data` carries the typed record (see `model`) serialized as a JSON value; the
/// concrete shape varies by `channel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedEvent {
    pub channel: Channel,
    pub event_type: String,
    pub data: Value,
    /// ISO-8601 UTC timestamp. Monotonically non-decreasing within a single session.
    pub timestamp: DateTime<Utc>,
    pub game_id: String,
    pub phase: Phase,
}

impl SanitizedEvent {
    pub fn new(
        channel: Channel,
        event_type: impl Into<String>,
        data: impl Serialize,
        game_id: impl Into<String>,
        phase: Phase,
        timestamp: DateTime<Utc>,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            channel,
            event_type: event_type.into(),
            data: serde_json::to_value(data)?,
            timestamp,
            game_id: game_id.into(),
            phase,
        })
    }
}
