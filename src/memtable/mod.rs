//! # Memtable Module
//!
//! ## Design Invariants
//!
//! - At most one entry per key; a tombstone and a live record for the
//!   same key never coexist.
//! - Inserting an existing key overwrites it in place — no versioning,
//!   no LSNs. Ordering across keys is given entirely by key order.
//! - Deletes are represented via tombstones, not physical removal:
//!   `delete` on a missing key still inserts a tombstone, so the
//!   deletion survives a flush to SST and shadows older layers.
//! - `values()` always returns entries in ascending key order — the
//!   SST encoder depends on this to build a strictly increasing index.
//!
//! ## Lifecycle
//!
//! A memtable is created empty, bound to a fresh WAL path. It accepts
//! writes until [`Memtable::over_capacity`] reports true, at which point
//! the engine freezes it into an [`ImmutableMemtable`] (see
//! [`Memtable::freeze`]) and begins writing to a new active memtable.
//! An immutable memtable is destroyed once its content has been written
//! to an SST and its WAL file deleted.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::trace;

use crate::record::{Record, SearchOutcome};

/// Entry count above which [`Memtable::over_capacity`] reports `true`.
///
/// Counts every entry, live or tombstone — the source this design is
/// drawn from hard-codes this to 50 entries; [`crate::engine::EngineConfig`]
/// exposes it as a configurable default rather than a constant.
pub const DEFAULT_CAPACITY: usize = 50;

/// The mutable, in-memory write buffer of the storage engine.
///
/// Holds at most one entry per key in a [`BTreeMap`], which gives
/// [`Memtable::values`] ascending order for free and makes `search` an
/// `O(log n)` lookup. Every method takes `&self` — callers synchronize
/// through the internal lock, not through exclusive access — because the
/// engine's outer lock only protects the *identity* of the active
/// memtable, not its contents (see [`crate::engine`]).
pub struct Memtable {
    inner: RwLock<BTreeMap<String, Record>>,
    wal_path: PathBuf,
    capacity: usize,
}

impl Memtable {
    /// Creates a fresh, empty memtable bound to `wal_path`.
    pub fn new(wal_path: PathBuf, capacity: usize) -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            wal_path,
            capacity,
        }
    }

    /// Creates a memtable already populated with `entries` — the shape
    /// WAL recovery hands back after replaying a file's frames.
    pub fn from_entries(wal_path: PathBuf, capacity: usize, entries: BTreeMap<String, Record>) -> Self {
        Self {
            inner: RwLock::new(entries),
            wal_path,
            capacity,
        }
    }

    /// Path of the WAL file backing this memtable — its identity.
    pub fn name(&self) -> &Path {
        &self.wal_path
    }

    /// Looks up `key`, returning the outcome this layer contributes to a
    /// fan-out lookup. See [`SearchOutcome`].
    pub fn search(&self, key: &str) -> SearchOutcome {
        let guard = read_lock(&self.inner);
        match guard.get(key) {
            None => SearchOutcome::None,
            Some(record) if record.deleted => SearchOutcome::Deleted,
            Some(record) => SearchOutcome::Success(record.clone()),
        }
    }

    /// Inserts or overwrites `key` with a live `value`.
    ///
    /// Returns the previous entry (if any) and whether it was a *live*
    /// record — a tombstoned key resurrected by `set` reports
    /// `had_old = false`, since there was nothing live to overwrite.
    pub fn set(&self, key: &str, value: Vec<u8>) -> (Option<Record>, bool) {
        trace!(key, "memtable set");
        let mut guard = write_lock(&self.inner);
        let previous = guard.insert(key.to_string(), Record::live(key, value));
        let had_old = matches!(&previous, Some(r) if !r.deleted);
        (previous, had_old)
    }

    /// Marks `key` deleted, inserting a tombstone if it was absent.
    ///
    /// Returns the previous entry (if any) and whether it was *live* —
    /// deleting an already-tombstoned or missing key reports
    /// `had_old = false`; deleting a live key reports `had_old = true`
    /// with the pre-deletion record.
    pub fn delete(&self, key: &str) -> (Option<Record>, bool) {
        trace!(key, "memtable delete");
        let mut guard = write_lock(&self.inner);
        let previous = guard.get(key).cloned();
        let had_old = matches!(&previous, Some(r) if !r.deleted);
        guard.insert(key.to_string(), Record::tombstone(key));
        (previous, had_old)
    }

    /// Returns every entry (live and tombstone) in ascending key order.
    pub fn values(&self) -> Vec<Record> {
        read_lock(&self.inner).values().cloned().collect()
    }

    /// Number of entries currently held, live or tombstone.
    pub fn len(&self) -> usize {
        read_lock(&self.inner).len()
    }

    /// `true` if this memtable holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` once the entry count exceeds the configured capacity —
    /// the sole trigger the engine uses to decide a rotation is due.
    pub fn over_capacity(&self) -> bool {
        self.len() > self.capacity
    }

    /// Absorbs every record of `other` into `self`, overwriting key by
    /// key. Used by the table tree to merge several SSTs' decoded
    /// contents into one during compaction — whichever record is
    /// absorbed last for a key wins, live or tombstone.
    pub fn merge(&self, other: &ImmutableMemtable) {
        let mut guard = write_lock(&self.inner);
        for record in other.values() {
            guard.insert(record.key.clone(), record);
        }
    }

    /// Consumes this memtable, turning it into a read-only
    /// [`ImmutableMemtable`] awaiting flush — the rotation protocol's
    /// second step (see [`crate::engine`]).
    pub fn freeze(self) -> ImmutableMemtable {
        ImmutableMemtable {
            wal_path: self.wal_path,
            entries: self.inner.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}

/// A read-only, frozen snapshot of a memtable awaiting flush to an SST.
///
/// Holds the same entries its source memtable held at freeze time, plus
/// the path of the WAL that still guarantees their durability until the
/// flush completes and that WAL is deleted.
pub struct ImmutableMemtable {
    wal_path: PathBuf,
    entries: BTreeMap<String, Record>,
}

impl ImmutableMemtable {
    /// Path of the WAL file this snapshot is still backed by.
    pub fn name(&self) -> &Path {
        &self.wal_path
    }

    /// Looks up `key` against this frozen snapshot.
    pub fn search(&self, key: &str) -> SearchOutcome {
        match self.entries.get(key) {
            None => SearchOutcome::None,
            Some(record) if record.deleted => SearchOutcome::Deleted,
            Some(record) => SearchOutcome::Success(record.clone()),
        }
    }

    /// Every entry (live and tombstone) in ascending key order.
    pub fn values(&self) -> Vec<Record> {
        self.entries.values().cloned().collect()
    }

    /// Number of entries held, live or tombstone.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if this snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
