use crate::Unrecoverable;
use derive_more::Constructor;
use futures::{Sink, Stream};
use std::{
    fmt::Debug,
    pin::Pin,
    task::{Context, Poll},
};
use tracing::warn;

/// Abstraction over a channel transmitter, allowing subscriber-facing code to hand out a
/// handle without committing to a concrete channel implementation (bounded, unbounded, ...).
pub trait Tx
where
    Self: Debug + Clone + Send,
{
    type Item;
    type Error: Unrecoverable + Debug;
    fn send<Item: Into<Self::Item>>(&self, item: Item) -> Result<(), Self::Error>;
}

/// Convenience type that holds an [`UnboundedTx`] and [`UnboundedRx`] pair.
#[derive(Debug)]
pub struct Channel<T> {
    pub tx: UnboundedTx<T>,
    pub rx: UnboundedRx<T>,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc_unbounded();
        Self { tx, rx }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct UnboundedTx<T> {
    pub tx: tokio::sync::mpsc::UnboundedSender<T>,
}

impl<T> UnboundedTx<T> {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<T>) -> Self {
        Self { tx }
    }
}

impl<T> Tx for UnboundedTx<T>
where
    T: Debug + Clone + Send,
{
    type Item = T;
    type Error = tokio::sync::mpsc::error::SendError<T>;

    fn send<Item: Into<Self::Item>>(&self, item: Item) -> Result<(), Self::Error> {
        self.tx.send(item.into())
    }
}

impl<T> Unrecoverable for tokio::sync::mpsc::error::SendError<T> {
    fn is_unrecoverable(&self) -> bool {
        true
    }
}

impl<T> Sink<T> for UnboundedTx<T> {
    type Error = tokio::sync::mpsc::error::SendError<T>;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
        self.tx.send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug, Constructor)]
pub struct UnboundedRx<T> {
    pub rx: tokio::sync::mpsc::UnboundedReceiver<T>,
}

impl<T> Iterator for UnboundedRx<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => break Some(event),
                Err(tokio::sync::mpsc::error::TryRecvError::Empty) => continue,
                Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => break None,
            }
        }
    }
}

impl<T> UnboundedRx<T> {
    pub fn into_stream(self) -> tokio_stream::wrappers::UnboundedReceiverStream<T> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
    }
}

impl<T> Stream for UnboundedRx<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

pub fn mpsc_unbounded<T>() -> (UnboundedTx<T>, UnboundedRx<T>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (UnboundedTx::new(tx), UnboundedRx::new(rx))
}

/// A bounded, non-blocking channel transmitter. Used by the channel broadcaster for every
/// subscriber handle: a subscriber that can't keep up simply has messages dropped rather than
/// stalling the fan-out loop.
#[derive(Debug, Clone)]
pub struct BoundedTx<T> {
    pub tx: tokio::sync::mpsc::Sender<T>,
}

impl<T> BoundedTx<T> {
    pub fn new(tx: tokio::sync::mpsc::Sender<T>) -> Self {
        Self { tx }
    }
}

impl<T> Tx for BoundedTx<T>
where
    T: Debug + Clone + Send,
{
    type Item = T;
    type Error = tokio::sync::mpsc::error::TrySendError<T>;

    fn send<Item: Into<Self::Item>>(&self, item: Item) -> Result<(), Self::Error> {
        self.tx.try_send(item.into())
    }
}

impl<T> Unrecoverable for tokio::sync::mpsc::error::TrySendError<T> {
    fn is_unrecoverable(&self) -> bool {
        // A full channel is a transient backpressure condition, not a reason to disable the
        // subscriber; only a closed receiver means the subscriber is actually gone.
        matches!(self, tokio::sync::mpsc::error::TrySendError::Closed(_))
    }
}

pub fn mpsc_bounded<T>(capacity: usize) -> (BoundedTx<T>, tokio::sync::mpsc::Receiver<T>) {
    let (tx, rx) = tokio::sync::mpsc::channel(capacity);
    (BoundedTx::new(tx), rx)
}

/// Wraps a channel transmitter, auto-disabling itself the first time a send is found to be
/// unrecoverable (eg/ the receiving end has been dropped). Once disabled, further sends are
/// silently skipped rather than attempted.
#[derive(Debug, Clone)]
pub struct ChannelTxDroppable<ChannelTx> {
    pub state: ChannelState<ChannelTx>,
}

impl<ChannelTx> ChannelTxDroppable<ChannelTx> {
    pub fn new(tx: ChannelTx) -> Self {
        Self {
            state: ChannelState::Active(tx),
        }
    }

    pub fn new_disabled() -> Self {
        Self {
            state: ChannelState::Disabled,
        }
    }

    pub fn disable(&mut self) {
        self.state = ChannelState::Disabled
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ChannelState::Active(_))
    }
}

#[derive(Debug, Clone)]
pub enum ChannelState<Tx> {
    Active(Tx),
    Disabled,
}

impl<ChannelTx> ChannelTxDroppable<ChannelTx>
where
    ChannelTx: Tx,
{
    /// Attempt to send `item`. Returns `true` if the send succeeded (or was benignly dropped
    /// due to backpressure), `false` if this caused the transmitter to be disabled.
    pub fn send(&mut self, item: ChannelTx::Item) -> bool {
        let ChannelState::Active(tx) = &self.state else {
            return false;
        };

        match tx.send(item) {
            Ok(()) => true,
            Err(error) if error.is_unrecoverable() => {
                let name = std::any::type_name::<ChannelTx::Item>();
                warn!(name, "channel receiver dropped - disabling transmitter");
                self.state = ChannelState::Disabled;
                false
            }
            Err(_) => true,
        }
    }
}
