//! # Engine Module
//!
//! The top-level coordinator: routes writes through the WAL into the
//! active memtable, rotates the memtable when it fills, and fans lookups
//! out across the active memtable, the immutable list, and the table
//! tree. A background worker, woken on a fixed tick, drains immutables
//! to level-0 SSTs and compacts over-threshold levels.
//!
//! ## Concurrency
//!
//! One `RwLock` protects the quadruple `(active memtable identity,
//! immutable list, active WAL identity, table tree structure)`. `get`
//! holds the shared side across the whole fan-out. `set`/`delete` hold
//! the shared side for the WAL append and memtable mutation — both are
//! internally synchronized — and only briefly upgrade to the exclusive
//! side if rotation is needed. The background worker always runs under
//! the exclusive side.
//!
//! ## Shutdown
//!
//! [`Engine::shutdown`] sends on a bounded-capacity-1
//! `crossbeam_channel`, which makes it synchronous and safe to call more
//! than once: a second send either wakes the already-exiting worker or
//! is observed by it before it parks again.

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{bounded, Sender};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::{Coded, ErrorKind};
use crate::memtable::{self, ImmutableMemtable, Memtable};
use crate::record::{Record, SearchOutcome};
use crate::table_tree::{self, TableTree, TableTreeError};
use crate::wal::{self, Wal, WalError};

const WAL_DIR: &str = "wal";
const SST_DIR: &str = "sst";

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A WAL-level operation failed.
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    /// A table tree-level operation failed.
    #[error("table tree error: {0}")]
    TableTree(#[from] TableTreeError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Coded for EngineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Engine
    }
}

/// Configuration for an [`Engine`] instance.
///
/// Every field carries the default this design's source program
/// hard-codes; all three are left configurable per the open question in
/// spec §9.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Entry count above which the active memtable rotates.
    pub memtable_capacity: usize,
    /// Table count above which a table tree level is a compaction
    /// candidate.
    pub level_threshold: usize,
    /// How often the background worker wakes to drain and compact.
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memtable_capacity: memtable::DEFAULT_CAPACITY,
            level_threshold: table_tree::DEFAULT_LEVEL_THRESHOLD,
            tick_interval: Duration::from_secs(10),
        }
    }
}

/// The caller-visible result of a point lookup.
///
/// Translates [`SearchOutcome::None`] and [`SearchOutcome::Deleted`] into
/// a single "there is no live value" case, per the engine's caller
/// convention (spec §4.6): a tombstone is reported back as an empty,
/// `deleted = true` record rather than distinguished from "never
/// written".
pub type GetResult = Option<Record>;

struct EngineState {
    /// `None` only for the instant inside [`Engine::rotate`] between
    /// consuming the old WAL via [`Wal::reset`] and storing its
    /// replacement — never observable outside that critical section.
    wal: Option<Wal>,
    memtable: Memtable,
    immutables: Vec<ImmutableMemtable>,
    tree: TableTree,
}

impl EngineState {
    fn wal(&self) -> &Wal {
        self.wal.as_ref().expect("wal is only None mid-rotation")
    }
}

/// The storage engine handle. Cheaply `Clone`-able; every clone shares
/// the same locked state and background worker.
pub struct Engine {
    state: Arc<RwLock<EngineState>>,
    config: EngineConfig,
    shutdown_tx: Sender<()>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Opens (or creates) an engine rooted at `dir`, restoring the WAL
    /// subsystem from `<dir>/wal` and the table tree from `<dir>/sst`,
    /// then starts the background worker.
    pub fn open(dir: impl AsRef<Path>, config: EngineConfig) -> Result<Self, EngineError> {
        let dir = dir.as_ref();
        let wal_dir = dir.join(WAL_DIR);
        let sst_dir = dir.join(SST_DIR);

        let restored = wal::restore(&wal_dir, config.memtable_capacity)?;
        let tree = TableTree::restore(&sst_dir, config.level_threshold)?;

        info!(
            dir = %dir.display(),
            immutables = restored.immutables.len(),
            levels = tree.level_count(),
            "engine opened"
        );

        let state = Arc::new(RwLock::new(EngineState {
            wal: Some(restored.wal),
            memtable: restored.memtable,
            immutables: restored.immutables,
            tree,
        }));

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let worker_state = Arc::clone(&state);
        let tick_interval = config.tick_interval;
        let worker = std::thread::spawn(move || background_loop(worker_state, tick_interval, shutdown_rx));

        Ok(Self {
            state,
            config,
            shutdown_tx,
            worker: std::sync::Mutex::new(Some(worker)),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a live `(key, value)` to the WAL, then applies it to the
    /// active memtable. Rotates if the memtable is now over capacity.
    pub fn set(&self, key: &str, value: Vec<u8>) -> Result<(), EngineError> {
        let guard = self.read();
        guard.wal().write(&Record::live(key, value.clone()))?;
        guard.memtable.set(key, value);
        let over_capacity = guard.memtable.over_capacity();
        drop(guard);

        if over_capacity {
            self.rotate()?;
        }
        Ok(())
    }

    /// Appends a tombstone for `key` to the WAL, then applies it to the
    /// active memtable. Rotates if the memtable is now over capacity.
    pub fn delete(&self, key: &str) -> Result<(), EngineError> {
        let guard = self.read();
        guard.wal().write(&Record::tombstone(key))?;
        guard.memtable.delete(key);
        let over_capacity = guard.memtable.over_capacity();
        drop(guard);

        if over_capacity {
            self.rotate()?;
        }
        Ok(())
    }

    /// Looks up `key`, probing the active memtable, every immutable
    /// (newest-first), then the table tree. A tombstone anywhere in this
    /// chain is reported as `Some(Record::tombstone(key))` rather than
    /// `None` — callers distinguish "was deleted" from "never written"
    /// by checking [`Record::deleted`].
    pub fn get(&self, key: &str) -> Result<GetResult, EngineError> {
        let guard = self.read();

        match guard.memtable.search(key) {
            SearchOutcome::Success(record) => return Ok(Some(record)),
            SearchOutcome::Deleted => return Ok(Some(Record::tombstone(key))),
            SearchOutcome::None => {}
        }

        for immutable in &guard.immutables {
            match immutable.search(key) {
                SearchOutcome::Success(record) => return Ok(Some(record)),
                SearchOutcome::Deleted => return Ok(Some(Record::tombstone(key))),
                SearchOutcome::None => {}
            }
        }

        match guard.tree.search(key)? {
            SearchOutcome::Success(record) => Ok(Some(record)),
            SearchOutcome::Deleted => Ok(Some(Record::tombstone(key))),
            SearchOutcome::None => Ok(None),
        }
    }

    /// Rotation protocol: new active WAL, freeze the active memtable,
    /// fresh empty memtable. Runs entirely under the exclusive lock.
    fn rotate(&self) -> Result<(), EngineError> {
        let mut guard = self.write();

        let old_wal = guard.wal.take().expect("wal is only None mid-rotation");
        let new_wal = old_wal.reset()?;
        let new_wal_path = new_wal.path().to_path_buf();
        guard.wal = Some(new_wal);

        let new_memtable = Memtable::new(new_wal_path, self.config.memtable_capacity);
        let old_memtable = std::mem::replace(&mut guard.memtable, new_memtable);
        guard.immutables.insert(0, old_memtable.freeze());

        debug!("memtable rotated");
        Ok(())
    }

    /// Signals the background worker to stop, waits for it to exit, then
    /// runs one final drain-and-compact pass synchronously. Safe to call
    /// more than once.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        let _ = self.shutdown_tx.send(());

        let mut slot = self.worker.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = slot.take() {
            let _ = handle.join();
        }
        drop(slot);

        run_tick(&self.state)
    }
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config,
            shutdown_tx: self.shutdown_tx.clone(),
            worker: std::sync::Mutex::new(None),
        }
    }
}

fn background_loop(state: Arc<RwLock<EngineState>>, tick_interval: Duration, shutdown_rx: crossbeam::channel::Receiver<()>) {
    loop {
        match shutdown_rx.recv_timeout(tick_interval) {
            Ok(()) => {
                info!("background worker received shutdown signal");
                break;
            }
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => {
                if let Err(err) = run_tick(&state) {
                    warn!(error = %err, "background tick failed, will retry next interval");
                }
            }
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => {
                error!("shutdown channel disconnected, stopping background worker");
                break;
            }
        }
    }
}

/// One drain-and-compact pass: flush every immutable to a level-0 SST
/// (oldest first, so admission order matches write order), deleting its
/// WAL on success, then compact every level currently over threshold.
fn run_tick(state: &Arc<RwLock<EngineState>>) -> Result<(), EngineError> {
    let mut guard = state.write().unwrap_or_else(|poisoned| poisoned.into_inner());

    while let Some(immutable) = guard.immutables.pop() {
        match guard.tree.insert(&immutable) {
            Ok(()) => {
                if let Err(err) = wal::delete_immutable_wal(&immutable) {
                    warn!(error = %err, "failed to delete flushed WAL file, will retry");
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to flush immutable memtable, leaving it for next tick");
                guard.immutables.push(immutable);
                break;
            }
        }
    }

    let candidates = guard.tree.check_compact_levels();
    for level in candidates {
        if let Err(err) = guard.tree.compact_level(level) {
            warn!(error = %err, level, "compaction failed, will retry next tick");
        }
    }

    Ok(())
}
