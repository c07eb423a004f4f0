//! Snapshot fan-out for live `fetch_all` subscriptions.
//!
//! # Responsibility
//! - Track active subscriber channels for one store instance.
//! - Deliver full-table snapshots without blocking the writer.
//! - Close subscribers after a terminal read failure.
//!
//! # Invariants
//! - Each subscriber sees strictly increasing snapshot sequences.
//! - A subscriber receives at most one error, after which its channel is
//!   closed.
//! - Dropping an `ItemStream` removes it from the hub.

use crate::model::item::Item;
use crate::repo::item_repo::RepoError;
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Point-in-time contents of the item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSnapshot {
    /// Commit sequence this snapshot reflects; 0 before any write.
    pub sequence: u64,
    /// All rows ordered by id.
    pub items: Vec<Item>,
}

/// One stream delivery: a snapshot, or the terminal failure.
pub type SnapshotResult = Result<ItemSnapshot, Arc<RepoError>>;

struct Subscriber {
    id: u64,
    last_sequence: u64,
    tx: Sender<SnapshotResult>,
}

/// Registry of live subscribers for one store.
pub(crate) struct SnapshotHub {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl SnapshotHub {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a subscriber and queues `initial` as its first delivery.
    pub(crate) fn subscribe(self: &Arc<Self>, initial: ItemSnapshot) -> ItemStream {
        let (tx, rx) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let last_sequence = initial.sequence;
        // The receiver is still in scope, so this send cannot fail.
        let _ = tx.send(Ok(initial));

        let mut subscribers = self.subscribers.lock();
        subscribers.push(Subscriber {
            id,
            last_sequence,
            tx,
        });
        debug!(
            "event=stream_subscribe module=store status=ok subscriber_id={id} subscribers={}",
            subscribers.len()
        );

        ItemStream {
            id,
            rx,
            hub: Arc::downgrade(self),
            finished: false,
        }
    }

    /// Sends `snapshot` to every subscriber that has not seen it yet.
    ///
    /// Returns the number of subscribers that received it. Disconnected
    /// subscribers are dropped.
    pub(crate) fn broadcast(&self, snapshot: &ItemSnapshot) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.subscribers.lock();
        subscribers.retain_mut(|subscriber| {
            if subscriber.last_sequence >= snapshot.sequence {
                return true;
            }
            if subscriber.tx.send(Ok(snapshot.clone())).is_err() {
                return false;
            }
            subscriber.last_sequence = snapshot.sequence;
            delivered += 1;
            true
        });
        delivered
    }

    /// Delivers `err` to every subscriber and closes them all.
    pub(crate) fn fail_all(&self, err: Arc<RepoError>) -> usize {
        let drained = std::mem::take(&mut *self.subscribers.lock());
        let count = drained.len();
        for subscriber in drained {
            let _ = subscriber.tx.send(Err(Arc::clone(&err)));
        }
        count
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| subscriber.id != id);
        debug!(
            "event=stream_cancel module=store status=ok subscriber_id={id} subscribers={}",
            subscribers.len()
        );
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Live view over the item table returned by `ItemStore::fetch_all`.
///
/// The first delivery is the table contents at subscription time. Later
/// deliveries follow committed changes; bursts of writes may be coalesced
/// into one snapshot. The stream ends when it is cancelled, the store is
/// dropped, or after a terminal error has been delivered.
pub struct ItemStream {
    id: u64,
    rx: Receiver<SnapshotResult>,
    hub: Weak<SnapshotHub>,
    finished: bool,
}

impl ItemStream {
    /// Blocks until the next delivery. Returns `None` once the stream ended.
    pub fn recv(&mut self) -> Option<SnapshotResult> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(delivery) => Some(self.observe(delivery)),
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }

    /// Waits up to `timeout` for the next delivery.
    ///
    /// # Errors
    /// - `RecvTimeoutError::Timeout` when nothing arrived in time.
    /// - `RecvTimeoutError::Disconnected` once the stream ended.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<SnapshotResult, RecvTimeoutError> {
        if self.finished {
            return Err(RecvTimeoutError::Disconnected);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(delivery) => Ok(self.observe(delivery)),
            Err(RecvTimeoutError::Disconnected) => {
                self.finished = true;
                Err(RecvTimeoutError::Disconnected)
            }
            Err(RecvTimeoutError::Timeout) => Err(RecvTimeoutError::Timeout),
        }
    }

    /// Returns a pending delivery without blocking.
    pub fn try_recv(&mut self) -> Result<SnapshotResult, TryRecvError> {
        if self.finished {
            return Err(TryRecvError::Disconnected);
        }
        match self.rx.try_recv() {
            Ok(delivery) => Ok(self.observe(delivery)),
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Err(TryRecvError::Disconnected)
            }
            Err(TryRecvError::Empty) => Err(TryRecvError::Empty),
        }
    }

    /// Stops further deliveries and releases this subscription.
    pub fn cancel(self) {}

    /// Returns whether the stream has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn observe(&mut self, delivery: SnapshotResult) -> SnapshotResult {
        if delivery.is_err() {
            self.finished = true;
        }
        delivery
    }
}

impl Iterator for ItemStream {
    type Item = SnapshotResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

impl Drop for ItemStream {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemSnapshot, SnapshotHub};
    use crate::model::item::Item;
    use crate::repo::item_repo::RepoError;
    use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
    use std::sync::Arc;
    use std::time::Duration;

    fn snapshot(sequence: u64, ids: &[i64]) -> ItemSnapshot {
        ItemSnapshot {
            sequence,
            items: ids
                .iter()
                .map(|id| Item::new(*id, format!("item-{id}")).unwrap())
                .collect(),
        }
    }

    #[test]
    fn subscribe_delivers_initial_snapshot_first() {
        let hub = Arc::new(SnapshotHub::new());
        let mut stream = hub.subscribe(snapshot(0, &[]));

        let first = stream.recv().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert!(first.items.is_empty());
        assert!(matches!(stream.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn broadcast_skips_sequences_already_seen() {
        let hub = Arc::new(SnapshotHub::new());
        let mut stream = hub.subscribe(snapshot(3, &[1]));
        stream.recv().unwrap().unwrap();

        assert_eq!(hub.broadcast(&snapshot(2, &[])), 0);
        assert_eq!(hub.broadcast(&snapshot(3, &[1])), 0);
        assert_eq!(hub.broadcast(&snapshot(4, &[1, 2])), 1);

        let next = stream.recv().unwrap().unwrap();
        assert_eq!(next.sequence, 4);
        assert_eq!(next.items.len(), 2);
        assert!(matches!(stream.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn dropping_stream_unsubscribes() {
        let hub = Arc::new(SnapshotHub::new());
        let stream_a = hub.subscribe(snapshot(0, &[]));
        let _stream_b = hub.subscribe(snapshot(0, &[]));
        assert_eq!(hub.len(), 2);

        stream_a.cancel();
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn fail_all_ends_every_stream_after_one_error() {
        let hub = Arc::new(SnapshotHub::new());
        let mut stream = hub.subscribe(snapshot(0, &[]));
        stream.recv().unwrap().unwrap();

        let closed = hub.fail_all(Arc::new(RepoError::InvalidData("boom".to_string())));
        assert_eq!(closed, 1);
        assert!(hub.is_empty());

        let err = stream.recv().unwrap().unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(stream.is_finished());
        assert!(stream.recv().is_none());
        assert!(matches!(
            stream.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn stream_ends_when_hub_is_dropped() {
        let hub = Arc::new(SnapshotHub::new());
        let mut stream = hub.subscribe(snapshot(0, &[]));
        stream.recv().unwrap().unwrap();

        drop(hub);
        assert!(stream.recv().is_none());
    }
}
