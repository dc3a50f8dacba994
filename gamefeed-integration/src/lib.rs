#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Gamefeed-Integration
//! Low-level framework for composing the WebSocket and channel plumbing that the
//! gamefeed upstream connector and channel broadcaster are built from.
//!
//! ## Core abstractions
//! - [`protocol::StreamParser`] translates raw stream messages (eg/ WebSocket) into a
//!   generic `Output` data structure.
//! - [`channel::Tx`] abstracts over different channel transmitter kinds so the broadcaster
//!   can hand out subscriber handles without caring how they're backed.
//! - [`backoff`] provides an exponential backoff policy shared by every reconnect loop.

/// All [`Error`](std::error::Error)s generated in Gamefeed-Integration.
pub mod error;

/// Contains `StreamParser` implementations for transforming communication protocol specific
/// messages into a generic output data structure.
pub mod protocol;

/// Defines a [`Tx`](channel::Tx) abstraction over different channel kinds, as well as
/// other channel utilities (`BoundedTx`, `UnboundedTx`, `ChannelTxDroppable`, etc).
pub mod channel;

/// Exponential backoff policy for reconnecting streams.
pub mod backoff;

/// Determines if something is considered "unrecoverable", such as an unrecoverable error.
///
/// Note that the meaning of [`Unrecoverable`] may vary depending on the context.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

/// Trait that communicates if something is terminal (eg/ requires shutdown or restart).
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}
