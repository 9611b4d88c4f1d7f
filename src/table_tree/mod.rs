//! Table Tree Module
//!
//! The level-organized catalog of on-disk SSTs. New tables are always
//! admitted at level 0; a level whose table count exceeds a threshold is
//! compacted into a single table one level down.
//!
//! # Layout on disk
//!
//! `<dir>/<level>.<index>.db`, `level ≥ 0`, `index` unique within its
//! level and strictly increasing with admission order — a larger `index`
//! within a level means more recently written content.
//!
//! # Search order
//!
//! Levels are probed ascending (0, 1, 2, …); within a level, tables are
//! probed newest-first (highest `index` first). The first non-[`None`]
//! outcome — including [`Deleted`] — wins, since shallower/newer content
//! always shadows deeper/older content.
//!
//! [`None`]: crate::record::SearchOutcome::None
//! [`Deleted`]: crate::record::SearchOutcome::Deleted
//!
//! # Locking
//!
//! This type holds no lock of its own — the engine's single
//! reader-writer lock is what protects the table tree's structure (see
//! [`crate::engine`]). Every method here takes `&self` or `&mut self`
//! accordingly.

#[cfg(test)]
mod tests;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::error::{Coded, ErrorKind};
use crate::memtable::ImmutableMemtable;
use crate::record::{Record, SearchOutcome};
use crate::sstable::{self, SSTable, SSTableError};

/// Table count above which a level is a compaction candidate.
pub const DEFAULT_LEVEL_THRESHOLD: usize = 10;

/// Errors returned by table tree operations.
#[derive(Debug, Error)]
pub enum TableTreeError {
    /// Underlying I/O error (directory scan, file removal).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An SST-level operation failed.
    #[error("SST error: {0}")]
    Sstable(#[from] SSTableError),
}

impl Coded for TableTreeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::TableTree
    }
}

/// The leveled catalog of SSTs.
pub struct TableTree {
    dir: PathBuf,
    threshold: usize,
    levels: Vec<Vec<SSTable>>,
}

impl TableTree {
    /// Creates an empty table tree rooted at `dir`.
    pub fn new(dir: PathBuf, threshold: usize) -> Self {
        Self {
            dir,
            threshold,
            levels: Vec::new(),
        }
    }

    /// Scans `dir` for `<L>.<I>.db` files and reconstructs every level in
    /// admission order — sorting by `(L, I)` ascending reproduces the
    /// order tables were originally appended in, since `I` is assigned
    /// sequentially per level.
    pub fn restore(dir: &Path, threshold: usize) -> Result<Self, TableTreeError> {
        fs::create_dir_all(dir)?;

        let mut found = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if let Some((level, index)) = sstable::parse_file_name(&path) {
                found.push((level, index, path));
            }
        }
        found.sort_by_key(|(level, index, _)| (*level, *index));

        let mut tree = Self::new(dir.to_path_buf(), threshold);
        for (level, index, path) in found {
            tree.ensure_level(level as usize);
            let table = SSTable::open(&path, level, index)?;
            tree.levels[level as usize].push(table);
        }

        info!(dir = %dir.display(), levels = tree.levels.len(), "table tree restored");
        Ok(tree)
    }

    /// Looks up `key`, probing levels ascending and, within a level,
    /// tables newest-first. Returns the first non-`None` outcome.
    pub fn search(&self, key: &str) -> Result<SearchOutcome, TableTreeError> {
        for level in &self.levels {
            for table in level.iter().rev() {
                let outcome = table.search(key)?;
                if outcome.is_terminal() {
                    return Ok(outcome);
                }
            }
        }
        Ok(SearchOutcome::None)
    }

    /// Admits `imm` as a new SST at level 0, naming it
    /// `0.<count(level 0)>.db`.
    pub fn insert(&mut self, imm: &ImmutableMemtable) -> Result<(), TableTreeError> {
        self.ensure_level(0);
        let index = self.levels[0].len() as u64;
        let path = self.dir.join(sstable::file_name(0, index));
        let table = SSTable::encode(&path, 0, index, imm)?;
        self.levels[0].push(table);
        debug!(index, "SST admitted at level 0");
        Ok(())
    }

    /// Returns every level currently over its compaction threshold, in
    /// ascending order.
    pub fn check_compact_levels(&self) -> Vec<usize> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, tables)| tables.len() > self.threshold)
            .map(|(level, _)| level)
            .collect()
    }

    /// Merges every SST at `level` into a single new SST at `level + 1`,
    /// then deletes the inputs and empties `level`.
    ///
    /// Records are folded in admission order (oldest table first), so a
    /// later table's record for a key overwrites an earlier one's —
    /// tombstones are preserved in the merge, never dropped.
    pub fn compact_level(&mut self, level: usize) -> Result<(), TableTreeError> {
        self.ensure_level(level);
        if self.levels[level].is_empty() {
            return Ok(());
        }

        // Decode and encode the merged output before touching `self.levels[level]` —
        // a failure here must leave the level's tables in place, not vanish them.
        let mut merged: std::collections::BTreeMap<String, Record> = std::collections::BTreeMap::new();
        for table in &self.levels[level] {
            for record in table.decode()? {
                merged.insert(record.key.clone(), record);
            }
        }
        let merged_values: Vec<Record> = merged.into_values().collect();

        let next_level = level + 1;
        self.ensure_level(next_level);
        let index = self.levels[next_level].len() as u64;
        let path = self.dir.join(sstable::file_name(next_level as u64, index));
        let output = SSTable::encode_values(&path, next_level as u64, index, &merged_values)?;
        self.levels[next_level].push(output);

        let tables = std::mem::take(&mut self.levels[level]);
        let input_count = tables.len();
        for table in tables {
            table.delete()?;
        }

        info!(level, next_level, input_count, "level compacted");
        Ok(())
    }

    fn ensure_level(&mut self, level: usize) {
        while self.levels.len() <= level {
            self.levels.push(Vec::new());
        }
    }

    /// Number of tables currently held at `level` (0 if the level doesn't
    /// exist yet). Exposed for engine bookkeeping and tests.
    pub fn level_len(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, Vec::len)
    }

    /// Number of levels currently tracked, including empty trailing ones.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
