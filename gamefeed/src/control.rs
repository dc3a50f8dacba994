//! Pure functions expressing the subscriber-facing control contract. This crate does not open
//! sockets itself (§1 Non-goals); an embedding HTTP/WebSocket layer calls these at its accept
//! path and on every inbound client frame.

use gamefeed_core::model::{Channel, UnknownChannel};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolve a subscription request (URL path tail, query param, or subscribe message) to a
/// [`Channel`]. An embedding layer should close the connection with a distinct code (e.g. 4004)
/// on [`UnknownChannel`] rather than silently defaulting to `all`.
pub fn route_channel_name(name: &str) -> Result<Channel, UnknownChannel> {
    Channel::parse(name)
}

#[derive(Debug, Clone, Deserialize)]
struct PingRequest {
    action: String,
    ts: Value,
}

#[derive(Debug, Clone, Serialize)]
struct PongReply {
    #[serde(rename = "type")]
    kind: &'static str,
    ts: Value,
}

/// Handle one inbound control frame from a subscriber. Recognizes only the keepalive
/// `{"action":"ping","ts":...}` contract, echoing the client's timestamp verbatim in a
/// `{"type":"pong","ts":...}` reply. Any other payload (including malformed JSON) yields `None`
/// and may be ignored by the caller.
pub fn handle_control_message(raw: &Value) -> Option<Value> {
    let request: PingRequest = serde_json::from_value(raw.clone()).ok()?;
    if request.action != "ping" {
        return None;
    }
    serde_json::to_value(PongReply {
        kind: "pong",
        ts: request.ts,
    })
    .ok()
}
