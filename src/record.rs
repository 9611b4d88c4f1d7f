//! Record codec — the unit of data that flows through every layer of the
//! store: the WAL, the memtable, and the SST data region.
//!
//! # On-disk shape
//!
//! A record is `(key: String, value: Vec<u8>, deleted: bool)`. It is encoded
//! as a fixed binary layout built from the primitives in [`crate::encoding`]:
//!
//! ```text
//! [u32 key_len][key bytes][u32 value_len][value bytes][1 byte deleted]
//! ```
//!
//! A tombstone (`deleted = true`) always carries an empty value — callers
//! never need to inspect `value` when `deleted` is set.
//!
//! This replaces a general-purpose text encoding (the system this design
//! originates from marshals records through JSON) with a compact binary
//! layout: no quoting, no escaping, and a record's encoded length is known
//! without re-parsing it, which is exactly what the SST sparse index needs.

use crate::encoding::{Decode, Encode, EncodingError};
use crate::error::{Coded, ErrorKind};
use thiserror::Error;

/// Errors produced while encoding or decoding a [`Record`].
#[derive(Debug, Error)]
pub enum RecordError {
    /// The underlying byte representation was malformed.
    #[error("record encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

impl Coded for RecordError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Marshal
    }
}

/// A single key/value entry, or a tombstone marking a deletion.
///
/// Keys are compared lexicographically as byte strings. A tombstone
/// (`deleted = true`) carries an empty `value` and shadows any older,
/// live record for the same key until compaction drops it (this design
/// never drops tombstones — see the module docs on [`crate::table_tree`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The record's key.
    pub key: String,
    /// The record's value. Always empty when `deleted` is `true`.
    pub value: Vec<u8>,
    /// Whether this record is a tombstone.
    pub deleted: bool,
}

impl Record {
    /// Builds a live record.
    pub fn live(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            deleted: false,
        }
    }

    /// Builds a tombstone for `key`.
    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            deleted: true,
        }
    }

    /// Encodes this record into a freshly-allocated buffer.
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        let mut buf = Vec::new();
        self.encode_to(&mut buf)?;
        Ok(buf)
    }

    /// Decodes a single record from the start of `buf`.
    ///
    /// Returns `(record, bytes_consumed)`. A decode error here is fatal to
    /// the caller's enclosing file per the crate-wide recovery policy —
    /// see [`crate::wal`] and [`crate::sstable`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), RecordError> {
        let (record, consumed) = <Self as Decode>::decode_from(buf)?;
        Ok((record, consumed))
    }
}

impl Encode for Record {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.key.encode_to(buf)?;
        self.value.encode_to(buf)?;
        self.deleted.encode_to(buf)?;
        Ok(())
    }
}

impl Decode for Record {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut offset = 0;
        let (key, n) = String::decode_from(&buf[offset..])?;
        offset += n;
        let (value, n) = Vec::<u8>::decode_from(&buf[offset..])?;
        offset += n;
        let (deleted, n) = bool::decode_from(&buf[offset..])?;
        offset += n;
        Ok((Self { key, value, deleted }, offset))
    }
}

/// The outcome of a point lookup against a single layer (a memtable, an
/// immutable memtable, an SST, or the table tree as a whole).
///
/// Callers fan a lookup out across layers newest-first and stop at the
/// first non-[`SearchOutcome::None`] result — [`SearchOutcome::Deleted`] is
/// a terminal hit (the key was shadowed by a tombstone), not a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The key is not present in this layer.
    None,
    /// The key was shadowed by a tombstone in this layer.
    Deleted,
    /// A live record was found.
    Success(Record),
}

impl SearchOutcome {
    /// `true` for anything other than [`SearchOutcome::None`] — the
    /// signal callers use to stop fanning a lookup out across layers.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchOutcome::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_record_roundtrips() {
        let rec = Record::live("hello", b"world".to_vec());
        let bytes = rec.encode().unwrap();
        let (decoded, consumed) = Record::decode(&bytes).unwrap();
        assert_eq!(decoded, rec);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn tombstone_roundtrips_with_empty_value() {
        let rec = Record::tombstone("gone");
        assert!(rec.value.is_empty());
        let bytes = rec.encode().unwrap();
        let (decoded, _) = Record::decode(&bytes).unwrap();
        assert_eq!(decoded, rec);
        assert!(decoded.deleted);
    }

    #[test]
    fn empty_key_and_value_roundtrip() {
        let rec = Record::live("", Vec::new());
        let bytes = rec.encode().unwrap();
        let (decoded, _) = Record::decode(&bytes).unwrap();
        assert_eq!(decoded, rec);
    }

    #[test]
    fn decode_truncated_frame_errors() {
        let rec = Record::live("k", b"v".to_vec());
        let bytes = rec.encode().unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(Record::decode(truncated).is_err());
    }

    #[test]
    fn search_outcome_terminal() {
        assert!(!SearchOutcome::None.is_terminal());
        assert!(SearchOutcome::Deleted.is_terminal());
        assert!(SearchOutcome::Success(Record::live("a", vec![1])).is_terminal());
    }
}
