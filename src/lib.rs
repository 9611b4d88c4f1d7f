//! # levelkv
//!
//! An embeddable, ordered key-value store built on a **Log-Structured
//! Merge Tree (LSM-tree)**. Writes land in a write-ahead log and an
//! in-memory memtable; once the memtable fills it is frozen and rotated
//! out, and a background worker flushes frozen memtables to sorted,
//! immutable on-disk tables and compacts them as they accumulate.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │  ┌────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │  Active     │   │  Immutable   │   │   Table Tree      │  │
//! │  │  Memtable   │──▶│  Memtables   │──▶│  (leveled SSTs)   │  │
//! │  │  + WAL      │   │  + WALs      │   │                    │  │
//! │  └────────────┘   └──────────────┘   └──────────────────┘  │
//! │        rotate            flush              compact         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! A single `RwLock` inside [`engine::Engine`] protects the active
//! memtable, the immutable list, the active WAL, and the table tree
//! structure together; the background worker runs every operation that
//! mutates on-disk state.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Coordinates the WAL, memtables, and table tree; the public entry point |
//! | [`memtable`] | In-memory ordered write buffer, backed by a WAL |
//! | [`wal`] | Write-ahead log for crash recovery, with restore-on-open |
//! | [`sstable`] | Immutable, sorted, on-disk table with a bloom filter and sparse index |
//! | [`table_tree`] | Leveled collection of SSTables with size-triggered compaction |
//! | [`record`] | The key/value/tombstone unit shared by every layer |
//! | [`encoding`] | Length-prefixed primitive and collection codec used on the wire and on disk |
//! | [`error`] | Shared error vocabulary and bilingual error descriptions |
//!
//! ## Key Features
//!
//! - **Write-ahead logging** — every mutation is appended to a WAL
//!   before it is applied to the memtable, so a crash mid-write is
//!   recovered by replay on reopen.
//! - **Tombstone deletes** — deletions are recorded as tombstones that
//!   shadow older values until compaction drops them.
//! - **Bloom filter lookups** — each SSTable carries a bloom filter so a
//!   missing key short-circuits before any disk seek.
//! - **Size-triggered leveled compaction** — a table tree level merges
//!   into the next once it holds more tables than its threshold.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use levelkv::engine::{Engine, EngineConfig};
//!
//! let engine = Engine::open("/tmp/my_db", EngineConfig::default()).unwrap();
//!
//! engine.set("hello", b"world".to_vec()).unwrap();
//! assert_eq!(engine.get("hello").unwrap().unwrap().value, b"world");
//!
//! engine.delete("hello").unwrap();
//! assert!(engine.get("hello").unwrap().unwrap().deleted);
//!
//! engine.shutdown().unwrap();
//! ```

#![allow(dead_code)]

pub mod encoding;
pub mod engine;
pub mod error;
pub mod memtable;
pub mod record;
pub mod sstable;
pub mod table_tree;
pub mod wal;
