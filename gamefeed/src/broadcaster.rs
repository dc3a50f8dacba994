//! Multi-channel fan-out hub: a bounded queue between the pipeline and a background task that
//! delivers each event to every live subscriber on its primary channel and on `all`.
//!
//! Directly grounded on the original `broadcaster.py`'s `ChannelBroadcaster`, with the
//! weakref-based subscriber sets replaced by [`gamefeed_integration::channel::ChannelTxDroppable`]
//! (lazy removal on a failed send is the Rust analogue of a dead weakref), and the single
//! asyncio queue replaced by a `tokio::sync::mpsc` channel feeding a dedicated fan-out task.

use gamefeed_core::model::{Channel, SanitizedEvent};
use gamefeed_integration::channel::{ChannelTxDroppable, Tx};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::{info, warn};

const CHANNEL_SLOTS: usize = 5;

fn channel_slot(channel: Channel) -> usize {
    match channel {
        Channel::Game => 0,
        Channel::Stats => 1,
        Channel::Trades => 2,
        Channel::History => 3,
        Channel::All => 4,
    }
}

pub type SubscriberId = u64;

#[derive(Debug)]
struct Subscriber<ChannelTx> {
    id: SubscriberId,
    tx: ChannelTxDroppable<ChannelTx>,
}

#[derive(Debug, Default)]
struct ChannelCounters {
    events_sent: AtomicU64,
}

#[derive(Debug, Default)]
struct GlobalCounters {
    total_events: AtomicU64,
    total_dropped: AtomicU64,
    clients_connected: AtomicU64,
    clients_disconnected: AtomicU64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelStats {
    pub clients: usize,
    pub events_sent: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcasterStats {
    pub total_events: u64,
    pub total_dropped: u64,
    pub clients_connected: u64,
    pub clients_disconnected: u64,
    pub queue_len: usize,
    pub channels: HashMap<String, ChannelStats>,
}

/// Owns per-channel subscriber sets and the bounded producer side of the fan-out queue.
/// `ChannelTx` is the subscriber-facing transmitter kind — typically
/// `gamefeed_integration::channel::BoundedTx<SanitizedEvent>` — left generic so an embedding
/// HTTP layer can supply whatever channel backs its sockets.
#[derive(Debug)]
pub struct ChannelBroadcaster<ChannelTx: Tx<Item = SanitizedEvent>> {
    subscribers: RwLock<[Vec<Subscriber<ChannelTx>>; CHANNEL_SLOTS]>,
    next_id: AtomicU64,
    channel_counters: [ChannelCounters; CHANNEL_SLOTS],
    global: GlobalCounters,
    queue_tx: mpsc::Sender<SanitizedEvent>,
}

impl<ChannelTx: Tx<Item = SanitizedEvent>> ChannelBroadcaster<ChannelTx> {
    /// Build a broadcaster with a bounded queue of `queue_capacity`, returning it alongside the
    /// receiver half the caller must drive with [`Self::run`].
    pub fn new(queue_capacity: usize) -> (Arc<Self>, mpsc::Receiver<SanitizedEvent>) {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity);
        let broadcaster = Arc::new(Self {
            subscribers: RwLock::new(std::array::from_fn(|_| Vec::new())),
            next_id: AtomicU64::new(1),
            channel_counters: std::array::from_fn(|_| ChannelCounters::default()),
            global: GlobalCounters::default(),
            queue_tx,
        });
        (broadcaster, queue_rx)
    }

    /// Add `tx` to `channel`'s subscriber set, returning an id usable with [`Self::unsubscribe`].
    pub fn subscribe(&self, channel: Channel, tx: ChannelTx) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write()[channel_slot(channel)].push(Subscriber {
            id,
            tx: ChannelTxDroppable::new(tx),
        });
        self.global.clients_connected.fetch_add(1, Ordering::Relaxed);
        info!(%channel, id, "subscriber added");
        id
    }

    pub fn unsubscribe(&self, channel: Channel, id: SubscriberId) {
        self.subscribers.write()[channel_slot(channel)].retain(|s| s.id != id);
        self.global.clients_disconnected.fetch_add(1, Ordering::Relaxed);
        info!(%channel, id, "subscriber removed");
    }

    /// Non-blocking: enqueue `event` for the fan-out task. On a full queue, the event is
    /// dropped and `total_dropped` bumped — the producer (the pipeline callback) never waits.
    pub fn broadcast(&self, event: SanitizedEvent) {
        if self.queue_tx.try_send(event).is_err() {
            self.global.total_dropped.fetch_add(1, Ordering::Relaxed);
            warn!("broadcast queue full, dropping event");
        }
    }

    /// Drain `queue_rx` and fan events out until `shutdown` fires or the queue closes.
    pub async fn run(self: Arc<Self>, mut queue_rx: mpsc::Receiver<SanitizedEvent>, shutdown: Arc<Notify>) {
        info!("broadcast loop started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => break,
                next = queue_rx.recv() => {
                    match next {
                        Some(event) => self.dispatch(&event),
                        None => break,
                    }
                }
            }
        }
        info!("broadcast loop stopped");
    }

    fn dispatch(&self, event: &SanitizedEvent) {
        let mut subscribers = self.subscribers.write();
        if event.channel != Channel::All {
            let slot = channel_slot(event.channel);
            Self::send_to_slot(&mut subscribers[slot], event);
            self.channel_counters[slot].events_sent.fetch_add(1, Ordering::Relaxed);
        }
        let all_slot = channel_slot(Channel::All);
        Self::send_to_slot(&mut subscribers[all_slot], event);
        self.channel_counters[all_slot].events_sent.fetch_add(1, Ordering::Relaxed);
        self.global.total_events.fetch_add(1, Ordering::Relaxed);
    }

    fn send_to_slot(slot: &mut Vec<Subscriber<ChannelTx>>, event: &SanitizedEvent) {
        slot.retain_mut(|subscriber| subscriber.tx.send(event.clone()));
    }

    /// Live subscriber count. With a channel, counts that channel's set; otherwise counts
    /// distinct subscriber ids across every channel (a subscriber only appears once per
    /// explicit [`Self::subscribe`] call, regardless of `all`'s implicit fan-out).
    pub fn client_count(&self, channel: Option<Channel>) -> usize {
        let subscribers = self.subscribers.read();
        match channel {
            Some(ch) => subscribers[channel_slot(ch)]
                .iter()
                .filter(|s| s.tx.is_active())
                .count(),
            None => {
                let mut ids = HashSet::new();
                for slot in subscribers.iter() {
                    ids.extend(slot.iter().filter(|s| s.tx.is_active()).map(|s| s.id));
                }
                ids.len()
            }
        }
    }

    pub fn stats(&self) -> BroadcasterStats {
        let subscribers = self.subscribers.read();
        let mut channels = HashMap::with_capacity(CHANNEL_SLOTS);
        for &channel in Channel::PRIMARY.iter().chain(std::iter::once(&Channel::All)) {
            let slot = channel_slot(channel);
            channels.insert(
                channel.as_str().to_owned(),
                ChannelStats {
                    clients: subscribers[slot].iter().filter(|s| s.tx.is_active()).count(),
                    events_sent: self.channel_counters[slot].events_sent.load(Ordering::Relaxed),
                },
            );
        }
        BroadcasterStats {
            total_events: self.global.total_events.load(Ordering::Relaxed),
            total_dropped: self.global.total_dropped.load(Ordering::Relaxed),
            clients_connected: self.global.clients_connected.load(Ordering::Relaxed),
            clients_disconnected: self.global.clients_disconnected.load(Ordering::Relaxed),
            queue_len: (self.queue_tx.max_capacity() - self.queue_tx.capacity()),
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamefeed_core::model::Phase;
    use gamefeed_integration::channel::mpsc_bounded;

    fn event(channel: Channel) -> SanitizedEvent {
        SanitizedEvent::new(channel, "test", serde_json::json!({}), "G1", Phase::Active, chrono::Utc::now())
            .unwrap()
    }

    #[tokio::test]
    async fn subscriber_on_game_receives_game_and_all_receives_both() {
        let (broadcaster, queue_rx) = ChannelBroadcaster::new(16);
        let shutdown = Arc::new(Notify::new());

        let (game_tx, mut game_rx) = mpsc_bounded(8);
        let (all_tx, mut all_rx) = mpsc_bounded(8);
        broadcaster.subscribe(Channel::Game, game_tx);
        broadcaster.subscribe(Channel::All, all_tx);

        let run_handle = tokio::spawn(broadcaster.clone().run(queue_rx, shutdown.clone()));

        broadcaster.broadcast(event(Channel::Game));
        broadcaster.broadcast(event(Channel::Stats));

        let first = tokio::time::timeout(std::time::Duration::from_secs(1), game_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.channel, Channel::Game);

        let all_first = tokio::time::timeout(std::time::Duration::from_secs(1), all_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let all_second = tokio::time::timeout(std::time::Duration::from_secs(1), all_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(all_first.channel, Channel::Game);
        assert_eq!(all_second.channel, Channel::Stats);

        shutdown.notify_one();
        run_handle.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_receiver_is_lazily_removed() {
        let (broadcaster, queue_rx) = ChannelBroadcaster::new(16);
        let shutdown = Arc::new(Notify::new());

        let (tx, rx) = mpsc_bounded(4);
        broadcaster.subscribe(Channel::Trades, tx);
        drop(rx);

        let run_handle = tokio::spawn(broadcaster.clone().run(queue_rx, shutdown.clone()));
        broadcaster.broadcast(event(Channel::Trades));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(broadcaster.client_count(Some(Channel::Trades)), 0);

        shutdown.notify_one();
        run_handle.await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_drops_and_counts() {
        let (broadcaster, _queue_rx) = ChannelBroadcaster::<gamefeed_integration::channel::BoundedTx<SanitizedEvent>>::new(1);
        broadcaster.broadcast(event(Channel::Game));
        broadcaster.broadcast(event(Channel::Game));
        broadcaster.broadcast(event(Channel::Game));
        assert_eq!(broadcaster.stats().total_dropped, 2);
    }
}
