//! Sorted String Table (SSTable) Module
//!
//! An SST is an immutable, on-disk file holding every record a memtable
//! held at flush time, laid out for fast point lookup without reading the
//! whole file:
//!
//! ```text
//! [data region][bloom region][sparse-index region][trailer]
//! ```
//!
//! - **Data region** — concatenated record encodings, no per-record
//!   length prefix; lengths live in the index.
//! - **Bloom region** — a serialized bloom filter over every key in this
//!   table, letting `search` reject a missing key without touching the
//!   index or the data region at all.
//! - **Sparse-index region** — a single encoded blob mapping
//!   `key → (offset, length, deleted)` into the data region.
//! - **Trailer** — a fixed-size footer of little-endian `i64` fields
//!   recording where everything else starts and how long it runs,
//!   always at `file_size - trailer_size`.
//!
//! # Trailer versions
//!
//! Every table this crate writes carries a version-2, 56-byte trailer
//! (`version, data_start, data_len, index_start, index_len, bloom_start,
//! bloom_len`). [`SSTable::open`] also accepts a version-1, 40-byte
//! trailer with no bloom fields, for tables written by a build without
//! the bloom region — dispatch is by trying the 56-byte tail first and
//! falling back to 40 bytes if its `version` field doesn't read as `2`.
//!
//! # Laziness
//!
//! The sparse index and the bloom filter are not read until the first
//! [`SSTable::search`] or [`SSTable::decode`] call — construction only
//! reads the trailer.


use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bloomfilter::Bloom;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::encoding::{self, Decode, Encode, EncodingError};
use crate::error::{Coded, ErrorKind};
use crate::memtable::ImmutableMemtable;
use crate::record::{Record, RecordError, SearchOutcome};

const TRAILER_V2_SIZE: usize = 7 * 8;
const TRAILER_V1_SIZE: usize = 5 * 8;
const VERSION_V1: i64 = 1;
const VERSION_V2: i64 = 2;
const BLOOM_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Errors returned by SST operations.
#[derive(Debug, Error)]
pub enum SSTableError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record encoding/decoding error.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// Raw byte encoding/decoding error (index or bloom region).
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The file is too small, or its trailer does not parse as either
    /// supported version.
    #[error("malformed SST trailer: {0}")]
    MalformedTrailer(String),
}

impl Coded for SSTableError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Sstable
    }
}

/// One entry of the sparse index: where a key's record lives in the data
/// region, and whether it's a tombstone.
struct IndexEntry {
    key: String,
    offset: u64,
    length: u64,
    deleted: bool,
}

impl Encode for IndexEntry {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.key.encode_to(buf)?;
        self.offset.encode_to(buf)?;
        self.length.encode_to(buf)?;
        self.deleted.encode_to(buf)?;
        Ok(())
    }
}

impl Decode for IndexEntry {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut offset = 0;
        let (key, n) = String::decode_from(&buf[offset..])?;
        offset += n;
        let (data_offset, n) = u64::decode_from(&buf[offset..])?;
        offset += n;
        let (length, n) = u64::decode_from(&buf[offset..])?;
        offset += n;
        let (deleted, n) = bool::decode_from(&buf[offset..])?;
        offset += n;
        Ok((
            Self {
                key,
                offset: data_offset,
                length,
                deleted,
            },
            offset,
        ))
    }
}

struct Trailer {
    version: i64,
    data_start: i64,
    data_len: i64,
    index_start: i64,
    index_len: i64,
    bloom_start: i64,
    bloom_len: i64,
}

impl Trailer {
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TRAILER_V2_SIZE);
        for field in [
            self.version,
            self.data_start,
            self.data_len,
            self.index_start,
            self.index_len,
            self.bloom_start,
            self.bloom_len,
        ] {
            buf.extend_from_slice(&field.to_le_bytes());
        }
        buf
    }

    fn decode_v2(buf: &[u8]) -> Option<Self> {
        let fields = decode_i64_fields(buf, 7)?;
        if fields[0] != VERSION_V2 {
            return None;
        }
        Some(Self {
            version: fields[0],
            data_start: fields[1],
            data_len: fields[2],
            index_start: fields[3],
            index_len: fields[4],
            bloom_start: fields[5],
            bloom_len: fields[6],
        })
    }

    fn decode_v1(buf: &[u8]) -> Option<Self> {
        let fields = decode_i64_fields(buf, 5)?;
        if fields[0] != VERSION_V1 {
            return None;
        }
        Some(Self {
            version: fields[0],
            data_start: fields[1],
            data_len: fields[2],
            index_start: fields[3],
            index_len: fields[4],
            bloom_start: 0,
            bloom_len: 0,
        })
    }
}

fn decode_i64_fields(buf: &[u8], count: usize) -> Option<Vec<i64>> {
    if buf.len() != count * 8 {
        return None;
    }
    let mut out = Vec::with_capacity(count);
    for chunk in buf.chunks_exact(8) {
        let bytes: [u8; 8] = chunk.try_into().ok()?;
        out.push(i64::from_le_bytes(bytes));
    }
    Some(out)
}

struct LazyIndex {
    by_key: std::collections::BTreeMap<String, IndexEntry>,
    bloom: Option<Bloom<String>>,
}

/// An immutable, on-disk sorted table of records.
pub struct SSTable {
    path: PathBuf,
    level: u64,
    index_id: u64,
    lazy: OnceLock<LazyIndex>,
}

impl SSTable {
    /// Encodes `source`'s records (in ascending key order) into a new SST
    /// file at `path`, tagged with its catalog coordinates `(level,
    /// index_id)` for [`SSTable::level`]/[`SSTable::index_id`].
    pub fn encode(path: &Path, level: u64, index_id: u64, source: &ImmutableMemtable) -> Result<Self, SSTableError> {
        Self::encode_values(path, level, index_id, &source.values())
    }

    /// Encodes an explicit, already-ordered slice of records — used by
    /// compaction, which merges several tables' decoded records before
    /// writing the output table.
    pub fn encode_values(path: &Path, level: u64, index_id: u64, values: &[Record]) -> Result<Self, SSTableError> {
        let mut data = Vec::new();
        let mut index_entries = Vec::with_capacity(values.len());
        let mut bloom = Bloom::<String>::new_for_fp_rate(values.len().max(1), BLOOM_FALSE_POSITIVE_RATE)
            .map_err(|e| SSTableError::MalformedTrailer(e.to_string()))?;

        for record in values {
            let offset = data.len() as u64;
            let body = record.encode()?;
            let length = body.len() as u64;
            data.extend_from_slice(&body);
            bloom.set(&record.key);
            index_entries.push(IndexEntry {
                key: record.key.clone(),
                offset,
                length,
                deleted: record.deleted,
            });
        }

        let data_len = data.len() as u64;
        let bloom_bytes = bloom.as_slice().to_vec();

        let mut index_buf = Vec::new();
        encoding::encode_vec(&index_entries, &mut index_buf)?;

        let mut file_buf = data;
        let bloom_start = file_buf.len() as u64;
        file_buf.extend_from_slice(&bloom_bytes);
        let bloom_len = bloom_bytes.len() as u64;
        let index_start = file_buf.len() as u64;
        file_buf.extend_from_slice(&index_buf);
        let index_len = index_buf.len() as u64;

        let trailer = Trailer {
            version: VERSION_V2,
            data_start: 0,
            data_len: data_len as i64,
            index_start: index_start as i64,
            index_len: index_len as i64,
            bloom_start: bloom_start as i64,
            bloom_len: bloom_len as i64,
        };
        file_buf.extend_from_slice(&trailer.encode());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &file_buf)?;

        debug!(
            path = %path.display(), level, index_id, records = values.len(), bytes = file_buf.len(),
            "SST encoded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            level,
            index_id,
            lazy: OnceLock::new(),
        })
    }

    /// Opens an already-encoded SST file at `path`, tagged with its
    /// catalog coordinates. Reads nothing but the trailer until the
    /// first [`SSTable::search`] or [`SSTable::decode`].
    pub fn open(path: &Path, level: u64, index_id: u64) -> Result<Self, SSTableError> {
        Ok(Self {
            path: path.to_path_buf(),
            level,
            index_id,
            lazy: OnceLock::new(),
        })
    }

    /// Full path of this table's file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The level this table was admitted/compacted into.
    pub fn level(&self) -> u64 {
        self.level
    }

    /// This table's index within its level — larger means newer.
    pub fn index_id(&self) -> u64 {
        self.index_id
    }

    fn ensure_lazy(&self) -> Result<&LazyIndex, SSTableError> {
        if let Some(lazy) = self.lazy.get() {
            return Ok(lazy);
        }
        let lazy = self.load_lazy()?;
        Ok(self.lazy.get_or_init(|| lazy))
    }

    fn load_lazy(&self) -> Result<LazyIndex, SSTableError> {
        let mut file = File::open(&self.path)?;
        let file_len = file.metadata()?.len();

        let trailer = read_trailer(&mut file, file_len)?;

        let index_bytes = read_region(&mut file, trailer.index_start as u64, trailer.index_len as u64)?;
        let (entries, _) = encoding::decode_vec::<IndexEntry>(&index_bytes)?;
        let by_key = entries.into_iter().map(|e| (e.key.clone(), e)).collect();

        let bloom = if trailer.bloom_len > 0 {
            let bloom_bytes = read_region(&mut file, trailer.bloom_start as u64, trailer.bloom_len as u64)?;
            Bloom::<String>::from_slice(&bloom_bytes).ok()
        } else {
            None
        };

        trace!(path = %self.path.display(), "SST index and bloom filter loaded");
        Ok(LazyIndex { by_key, bloom })
    }

    /// Looks up `key`, populating the lazily-loaded index (and bloom
    /// filter) on first use.
    pub fn search(&self, key: &str) -> Result<SearchOutcome, SSTableError> {
        let lazy = self.ensure_lazy()?;

        if let Some(bloom) = &lazy.bloom {
            if !bloom.check(key) {
                return Ok(SearchOutcome::None);
            }
        }

        let Some(entry) = lazy.by_key.get(key) else {
            return Ok(SearchOutcome::None);
        };
        if entry.deleted {
            return Ok(SearchOutcome::Deleted);
        }

        let mut file = File::open(&self.path)?;
        let body = read_region(&mut file, entry.offset, entry.length)?;
        let (record, _) = Record::decode(&body)?;
        Ok(SearchOutcome::Success(record))
    }

    /// Decodes every record in this table, in ascending key order — used
    /// by compaction to reconstruct a mergeable in-memory view.
    pub fn decode(&self) -> Result<Vec<Record>, SSTableError> {
        let lazy = self.ensure_lazy()?;
        let mut file = File::open(&self.path)?;
        let mut records = Vec::with_capacity(lazy.by_key.len());
        for entry in lazy.by_key.values() {
            let body = read_region(&mut file, entry.offset, entry.length)?;
            let (record, _) = Record::decode(&body)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Removes this table's file from disk. Consumes `self` — a deleted
    /// table handle is unusable.
    pub fn delete(self) -> Result<(), SSTableError> {
        fs::remove_file(&self.path)?;
        debug!(path = %self.path.display(), "SST file deleted");
        Ok(())
    }
}

fn read_trailer(file: &mut File, file_len: u64) -> Result<Trailer, SSTableError> {
    if file_len >= TRAILER_V2_SIZE as u64 {
        let buf = read_region(file, file_len - TRAILER_V2_SIZE as u64, TRAILER_V2_SIZE as u64)?;
        if let Some(trailer) = Trailer::decode_v2(&buf) {
            return Ok(trailer);
        }
    }
    if file_len >= TRAILER_V1_SIZE as u64 {
        let buf = read_region(file, file_len - TRAILER_V1_SIZE as u64, TRAILER_V1_SIZE as u64)?;
        if let Some(trailer) = Trailer::decode_v1(&buf) {
            warn!("SST opened with legacy bloom-less trailer");
            return Ok(trailer);
        }
    }
    Err(SSTableError::MalformedTrailer(format!(
        "file of {file_len} bytes does not end in a recognized trailer"
    )))
}

fn read_region(file: &mut File, offset: u64, len: u64) -> Result<Vec<u8>, SSTableError> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Parses an SST file name of the form `<level>.<index>.db`.
pub(crate) fn parse_file_name(path: &Path) -> Option<(u64, u64)> {
    let name = path.file_name()?.to_str()?;
    let name = name.strip_suffix(".db")?;
    let (level, index) = name.split_once('.')?;
    Some((level.parse().ok()?, index.parse().ok()?))
}

/// Builds an SST file name `<level>.<index>.db`.
pub(crate) fn file_name(level: u64, index_id: u64) -> String {
    format!("{level}.{index_id}.db")
}
