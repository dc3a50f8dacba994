use crate::error::SocketError;
use futures::Stream;

/// Convenient `WebSocket` type aliases and a default `WebSocket` [`StreamParser`] implementation.
pub mod websocket;

/// `StreamParser`s are capable of parsing the input messages from a given stream protocol
/// (eg/ WebSocket) and deserialising into an `Output`.
pub trait StreamParser<Output> {
    type Stream: Stream;
    type Message;
    type Error;

    fn parse(input: Result<Self::Message, Self::Error>) -> Option<Result<Output, SocketError>>;
}
