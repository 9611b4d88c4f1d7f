//! Write-Ahead Logging (WAL) Module
//!
//! One WAL file backs exactly one memtable. Every successful [`Wal::write`]
//! appends a framed record — `[8-byte little-endian length][encoded
//! record]` — and is durably on disk (via `fsync`) before the caller's
//! memtable mutation returns. There is no header, no checksum: framing
//! mismatches at recovery are fatal by design (see module docs on
//! [`crate::error`] for the propagation policy this implies).
//!
//! # On-disk layout
//!
//! ```text
//! [u64 len LE][record bytes]
//! [u64 len LE][record bytes]
//! ...
//! ```
//!
//! # Naming and directory scan
//!
//! Files are named `<N>.wal.log` with `N` a positive integer, strictly
//! increasing per rotation. [`restore`] treats the largest `N` present as
//! the active WAL and walks `N-1, N-2, …` down to the first gap, building
//! the immutable list newest-first — see its doc comment for the precise
//! contiguity rule.
//!
//! # Recovery and partial frames
//!
//! A frame whose declared length cannot be satisfied by the remaining
//! bytes in the file is a partial write at the tail — the process crashed
//! mid-append. Rather than treat this as fatal, replay stops at the last
//! complete frame and the file is truncated to that boundary, so the next
//! `write` continues cleanly. A frame that IS fully present but fails to
//! decode is a genuine corruption and is fatal, crashing recovery rather
//! than risking a silently incomplete in-memory view.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::error::{Coded, ErrorKind};
use crate::memtable::{ImmutableMemtable, Memtable};
use crate::record::{Record, RecordError};

const LEN_PREFIX_SIZE: usize = std::mem::size_of::<u64>();
const WAL_SUFFIX: &str = ".wal.log";

/// Errors returned by WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A complete, length-delimited frame failed to decode — genuine
    /// corruption, not a partial write. Fatal per the recovery policy.
    #[error("WAL record decode error: {0}")]
    Record(#[from] RecordError),

    /// A path under the WAL directory did not match `<N>.wal.log`.
    #[error("malformed WAL file name: {0}")]
    MalformedName(String),
}

impl Coded for WalError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Wal
    }
}

/// A single WAL file, bound to one memtable's index.
pub struct Wal {
    file: Mutex<File>,
    path: PathBuf,
    index: u64,
}

impl Wal {
    /// Creates (or reopens) the WAL file for index `index` under `dir`.
    pub fn create(dir: &Path, index: u64) -> Result<Self, WalError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(file_name(index));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        info!(path = %path.display(), index, "WAL file opened");
        Ok(Self {
            file: Mutex::new(file),
            path,
            index,
        })
    }

    /// Opens an existing WAL file at `path` whose name encodes `index`.
    fn open_existing(path: PathBuf, index: u64) -> Result<Self, WalError> {
        let file = OpenOptions::new().read(true).append(true).open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
            index,
        })
    }

    /// Path of this WAL file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `N` encoded in this WAL's file name.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Appends `record`, framed with an 8-byte little-endian length
    /// prefix, and fsyncs before returning.
    pub fn write(&self, record: &Record) -> Result<(), WalError> {
        let body = record.encode()?;
        let len = body.len() as u64;

        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        guard.write_all(&len.to_le_bytes())?;
        guard.write_all(&body)?;
        guard.sync_all()?;

        trace!(path = %self.path.display(), len, "WAL record appended");
        Ok(())
    }

    /// Replays every complete frame in this file, in on-disk order.
    ///
    /// A trailing partial frame (declared length longer than the bytes
    /// actually present) is not an error: replay stops there and the file
    /// is truncated to the last complete frame boundary. A complete frame
    /// that fails to decode is a fatal [`WalError::Record`].
    fn replay(&self) -> Result<Vec<Record>, WalError> {
        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        guard.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::new();
        guard.read_to_end(&mut buf)?;

        let mut records = Vec::new();
        let mut offset = 0usize;

        loop {
            if offset + LEN_PREFIX_SIZE > buf.len() {
                if offset != buf.len() {
                    warn!(
                        path = %self.path.display(),
                        offset,
                        total = buf.len(),
                        "WAL truncating partial trailing length prefix"
                    );
                }
                break;
            }

            let len_bytes: [u8; LEN_PREFIX_SIZE] = buf[offset..offset + LEN_PREFIX_SIZE]
                .try_into()
                .expect("slice length matches LEN_PREFIX_SIZE");
            let len = u64::from_le_bytes(len_bytes) as usize;
            let body_start = offset + LEN_PREFIX_SIZE;

            if body_start + len > buf.len() {
                warn!(
                    path = %self.path.display(),
                    offset,
                    declared_len = len,
                    available = buf.len() - body_start,
                    "WAL truncating partial trailing record"
                );
                break;
            }

            let (record, consumed) = Record::decode(&buf[body_start..body_start + len])?;
            debug_assert_eq!(consumed, len);
            records.push(record);
            offset = body_start + len;
        }

        if offset != buf.len() {
            guard.set_len(offset as u64)?;
            guard.seek(SeekFrom::End(0))?;
        }

        debug!(path = %self.path.display(), count = records.len(), "WAL replay complete");
        Ok(records)
    }

    /// Closes the current file and opens the next index (`self.index +
    /// 1`) as the new active WAL — the first step of the rotation
    /// protocol. Consumes `self`.
    pub fn reset(self) -> Result<Wal, WalError> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let next_index = self.index + 1;
        drop(self);
        Wal::create(&dir, next_index)
    }

    /// Deletes this WAL's backing file. Consumes `self`, since a deleted
    /// WAL handle has nothing left to operate on.
    pub fn delete(self) -> Result<(), WalError> {
        let path = self.path.clone();
        drop(self);
        fs::remove_file(&path)?;
        info!(path = %path.display(), "WAL file deleted");
        Ok(())
    }
}

/// Deletes the WAL file backing an [`ImmutableMemtable`] once its
/// content has been durably flushed to an SST.
pub fn delete_immutable_wal(immutable: &ImmutableMemtable) -> Result<(), WalError> {
    fs::remove_file(immutable.name())?;
    info!(path = %immutable.name().display(), "immutable WAL file deleted");
    Ok(())
}

/// The outcome of scanning a WAL directory at startup.
pub struct Restored {
    /// The active WAL, opened and ready to accept writes.
    pub wal: Wal,
    /// The active memtable, replayed from `wal`.
    pub memtable: Memtable,
    /// Immutable memtables awaiting flush, newest-first.
    pub immutables: Vec<ImmutableMemtable>,
}

/// Scans `dir` for `<N>.wal.log` files and reconstructs the active
/// memtable plus the ordered list of immutables awaiting flush.
///
/// Let `M` be the largest `N` present (or `1` if the directory holds no
/// WAL files at all, in which case a fresh WAL is created). `M.wal.log`
/// becomes the active WAL, replayed into the active memtable. Then, for
/// `N = M-1, M-2, …`, as long as `N.wal.log` exists, it is replayed into
/// an immutable memtable and appended to the returned list — the list
/// therefore holds immutables newest-first. The first missing index
/// below `M` terminates the scan; gaps are never searched past.
pub fn restore(dir: &Path, capacity: usize) -> Result<Restored, WalError> {
    fs::create_dir_all(dir)?;

    let mut indices = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if let Some(index) = parse_index(&path) {
            indices.push(index);
        }
    }

    let max_index = indices.into_iter().max().unwrap_or(1);

    let active_path = dir.join(file_name(max_index));
    let wal = if active_path.exists() {
        Wal::open_existing(active_path, max_index)?
    } else {
        Wal::create(dir, max_index)?
    };

    let active_records = wal.replay()?;
    let memtable = Memtable::from_entries(wal.path().to_path_buf(), capacity, to_map(active_records));

    let mut immutables = Vec::new();
    let mut next = max_index;
    while next > 1 {
        next -= 1;
        let path = dir.join(file_name(next));
        if !path.exists() {
            break;
        }
        let imm_wal = Wal::open_existing(path, next)?;
        let records = imm_wal.replay()?;
        let frozen = Memtable::from_entries(imm_wal.path().to_path_buf(), capacity, to_map(records)).freeze();
        immutables.push(frozen);
    }

    info!(
        dir = %dir.display(),
        active_index = max_index,
        immutable_count = immutables.len(),
        "WAL directory restored"
    );

    Ok(Restored {
        wal,
        memtable,
        immutables,
    })
}

fn to_map(records: Vec<Record>) -> BTreeMap<String, Record> {
    records.into_iter().map(|r| (r.key.clone(), r)).collect()
}

fn file_name(index: u64) -> String {
    format!("{index}{WAL_SUFFIX}")
}

fn parse_index(path: &Path) -> Option<u64> {
    let name = path.file_name().and_then(OsStr::to_str)?;
    name.strip_suffix(WAL_SUFFIX)?.parse::<u64>().ok()
}
