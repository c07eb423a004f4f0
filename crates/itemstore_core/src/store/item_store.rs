//! Live item store: the public record-store façade.
//!
//! # Responsibility
//! - Own the single connection to one store file.
//! - Serialize insert/delete into one transaction each.
//! - Feed `fetch_all` subscribers a fresh snapshot after every committed
//!   change, from a notifier thread so writers never wait on readers.
//!
//! # Invariants
//! - The commit sequence grows by one per write that changed rows, and is
//!   only read or written under the connection lock.
//! - A new subscriber is registered under the same lock as its initial
//!   read, so no later commit can be missed.
//! - Errors are never retried here; callers decide.

use crate::db::{open_db_in_memory, open_db_with_timeout, DbError, StoreLock};
use crate::model::item::{Item, ItemId, NewItem};
use crate::model::schema::ITEM_SCHEMA;
use crate::repo::item_repo::{
    ConflictPolicy, ItemRepository, MissingRowPolicy, RepoError, RepoResult,
    SqliteItemRepository,
};
use crate::store::config::StoreConfig;
use crate::store::watch::{ItemSnapshot, ItemStream, SnapshotHub};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, TransactionBehavior};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const NOTIFIER_THREAD_NAME: &str = "itemstore-notifier";

struct StoreState {
    conn: Connection,
    sequence: u64,
}

struct Shared {
    state: Mutex<StoreState>,
    hub: Arc<SnapshotHub>,
}

impl Shared {
    fn read_snapshot(&self) -> RepoResult<ItemSnapshot> {
        let state = self.state.lock();
        read_snapshot(&state)
    }
}

/// Durable item table with insert, delete and a live full-table query.
///
/// Share one instance across threads with `Arc<ItemStore>`; a second
/// instance on the same file is refused while this one is alive.
pub struct ItemStore {
    shared: Arc<Shared>,
    conflict_policy: ConflictPolicy,
    missing_row_policy: MissingRowPolicy,
    refresh_tx: Option<Sender<()>>,
    notifier: Option<JoinHandle<()>>,
    _lock: Option<StoreLock>,
}

impl ItemStore {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    /// - `DbError::StoreLocked` when another store holds the file.
    /// - `DbError::SchemaMismatch` (and related) when the stored layout
    ///   differs from `ITEM_SCHEMA`; no rows are touched in that case.
    /// - `DbError::Sqlite` / `DbError::Io` for unreadable or corrupt files.
    pub fn open(config: StoreConfig) -> RepoResult<Self> {
        let (conn, lock) = match config.path.as_deref() {
            Some(path) => {
                let lock = StoreLock::acquire(path)?;
                let conn = open_db_with_timeout(path, &ITEM_SCHEMA, config.busy_timeout)?;
                (conn, Some(lock))
            }
            None => (open_db_in_memory(&ITEM_SCHEMA)?, None),
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(StoreState { conn, sequence: 0 }),
            hub: Arc::new(SnapshotHub::new()),
        });

        let (refresh_tx, refresh_rx) = mpsc::channel();
        let notifier_shared = Arc::clone(&shared);
        let notifier = thread::Builder::new()
            .name(NOTIFIER_THREAD_NAME.to_string())
            .spawn(move || run_notifier(notifier_shared, refresh_rx))
            .map_err(DbError::Io)?;

        info!(
            "event=store_open module=store status=ok mode={} conflict_policy={:?} missing_row_policy={:?}",
            if config.path.is_some() { "file" } else { "memory" },
            config.conflict_policy,
            config.missing_row_policy
        );

        Ok(Self {
            shared,
            conflict_policy: config.conflict_policy,
            missing_row_policy: config.missing_row_policy,
            refresh_tx: Some(refresh_tx),
            notifier: Some(notifier),
            _lock: lock,
        })
    }

    /// Opens a private in-memory store with default policies.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::open(StoreConfig::in_memory())
    }

    /// Subscribes to the full table contents.
    ///
    /// The returned stream already holds the current snapshot; later
    /// snapshots arrive after each committed insert or delete.
    pub fn fetch_all(&self) -> RepoResult<ItemStream> {
        let state = self.shared.state.lock();
        let snapshot = match read_snapshot(&state) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    "event=stream_subscribe module=store status=error error_code=snapshot_read_failed error={}",
                    err
                );
                return Err(err);
            }
        };
        Ok(self.shared.hub.subscribe(snapshot))
    }

    /// Inserts one item under the configured conflict policy.
    ///
    /// # Errors
    /// - `RepoError::ConstraintViolation` when the id exists and the policy
    ///   is `ConflictPolicy::Abort`.
    /// - `RepoError::Validation` for invalid payloads.
    pub fn insert(&self, item: &Item) -> RepoResult<()> {
        let policy = self.conflict_policy;
        self.write("item_insert", Some(item.id), |repo| {
            repo.insert_item(item, policy)?;
            Ok(((), true))
        })
    }

    /// Inserts a payload and lets storage assign the next id.
    pub fn insert_new(&self, item: &NewItem) -> RepoResult<ItemId> {
        self.write("item_insert_new", None, |repo| {
            let id = repo.insert_new_item(item)?;
            Ok((id, true))
        })
    }

    /// Deletes the row with `item.id`.
    ///
    /// A missing row is a no-op under `MissingRowPolicy::Ignore` (no
    /// snapshot is emitted) and `RepoError::NotFound` under
    /// `MissingRowPolicy::Error`.
    pub fn delete(&self, item: &Item) -> RepoResult<()> {
        let policy = self.missing_row_policy;
        self.write("item_delete", Some(item.id), |repo| {
            let removed = repo.delete_item(item)?;
            if !removed && policy == MissingRowPolicy::Error {
                return Err(RepoError::NotFound(item.id));
            }
            Ok(((), removed))
        })
    }

    /// Number of live `fetch_all` subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.hub.len()
    }

    fn write<T>(
        &self,
        event: &str,
        item_id: Option<ItemId>,
        op: impl FnOnce(&SqliteItemRepository<'_>) -> RepoResult<(T, bool)>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let outcome = {
            let mut state = self.shared.state.lock();
            commit_write(&mut state, op)
        };

        match outcome {
            Ok((value, Some(sequence))) => {
                debug!(
                    "event={event} module=store status=ok item_id={} sequence={sequence} duration_ms={}",
                    format_item_id(item_id),
                    started_at.elapsed().as_millis()
                );
                self.request_refresh();
                Ok(value)
            }
            Ok((value, None)) => {
                debug!(
                    "event={event} module=store status=ok item_id={} changed=false duration_ms={}",
                    format_item_id(item_id),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event={event} module=store status=error item_id={} error_kind={:?} error={}",
                    format_item_id(item_id),
                    err.kind(),
                    err
                );
                Err(err)
            }
        }
    }

    fn request_refresh(&self) {
        if let Some(tx) = &self.refresh_tx {
            // Only fails once the notifier is gone, i.e. during drop.
            let _ = tx.send(());
        }
    }
}

impl Drop for ItemStore {
    fn drop(&mut self) {
        self.refresh_tx.take();
        if let Some(handle) = self.notifier.take() {
            if handle.join().is_err() {
                error!("event=store_close module=store status=error error_code=notifier_panicked");
            }
        }
        debug!("event=store_close module=store status=ok");
    }
}

/// Runs `op` in one immediate transaction; bumps the sequence if it changed
/// rows.
fn commit_write<T>(
    state: &mut StoreState,
    op: impl FnOnce(&SqliteItemRepository<'_>) -> RepoResult<(T, bool)>,
) -> RepoResult<(T, Option<u64>)> {
    let tx = state
        .conn
        .transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (value, changed) = op(&SqliteItemRepository::new_unchecked(&tx))?;
    tx.commit()?;

    if !changed {
        return Ok((value, None));
    }
    state.sequence += 1;
    Ok((value, Some(state.sequence)))
}

fn read_snapshot(state: &StoreState) -> RepoResult<ItemSnapshot> {
    let items = SqliteItemRepository::new_unchecked(&state.conn).list_items()?;
    Ok(ItemSnapshot {
        sequence: state.sequence,
        items,
    })
}

fn run_notifier(shared: Arc<Shared>, refresh_rx: Receiver<()>) {
    while refresh_rx.recv().is_ok() {
        // Coalesce bursts: one read covers every commit queued so far.
        while refresh_rx.try_recv().is_ok() {}

        if shared.hub.is_empty() {
            continue;
        }

        match shared.read_snapshot() {
            Ok(snapshot) => {
                let delivered = shared.hub.broadcast(&snapshot);
                debug!(
                    "event=stream_emit module=store status=ok sequence={} items={} delivered={delivered}",
                    snapshot.sequence,
                    snapshot.items.len()
                );
            }
            Err(err) => {
                error!(
                    "event=stream_emit module=store status=error error_code=snapshot_read_failed error={}",
                    err
                );
                let closed = shared.hub.fail_all(Arc::new(err));
                warn!("event=stream_close module=store status=error closed={closed}");
            }
        }
    }
}

fn format_item_id(item_id: Option<ItemId>) -> String {
    item_id.map_or_else(|| "new".to_string(), |id| id.to_string())
}
