//! Shared error vocabulary used across every subsystem.
//!
//! Each subsystem (`memtable`, `wal`, `sstable`, `table_tree`, `engine`)
//! defines its own `thiserror`-derived error enum for ergonomic `?`
//! propagation and `source()` chaining. On top of that, every error in the
//! crate answers two cross-cutting questions that a module-local `Display`
//! impl doesn't: "which module owns this, as a stable number a caller can
//! switch on" and "what should a human operator be told, in their
//! language". This module provides the vocabulary for both.
//!
//! # Design origin
//!
//! The numeric-code-plus-bilingual-cause scheme is not a Rust idiom by
//! itself — it is carried over from the system this crate's design
//! originates from, which tagged every error with a module-qualified code
//! and a Chinese/English description selected by a global language switch.
//! Here that becomes a small, typed `ErrorKind` plus a `Locale` enum rather
//! than a runtime string registry, so the compiler checks exhaustiveness.

use std::fmt;

/// Selects which language [`ErrorKind::describe`] renders its cause in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// English.
    #[default]
    En,
    /// Simplified Chinese.
    Zh,
}

/// The subsystem that originated an error, paired with a stable numeric
/// code callers can match on without string comparison.
///
/// Codes are module-qualified: the hundreds digit identifies the
/// subsystem, the rest is reserved for future per-kind refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Record encode/decode failure.
    Marshal,
    /// Memtable-layer failure (capacity, lock, invariant).
    Memtable,
    /// SST-layer failure (I/O, decode, trailer).
    Sstable,
    /// Table-tree-layer failure (admission, compaction).
    TableTree,
    /// WAL-layer failure (I/O, framing, recovery).
    Wal,
    /// Engine-layer failure not attributable to a single subsystem below it.
    Engine,
    /// Anything that doesn't fit the above — should be rare in practice.
    Unknown,
}

impl ErrorKind {
    /// Stable numeric code for this kind, module-qualified (hundreds digit).
    pub const fn code(self) -> u32 {
        match self {
            ErrorKind::Unknown => 100,
            ErrorKind::Marshal => 200,
            ErrorKind::Memtable => 300,
            ErrorKind::Sstable => 400,
            ErrorKind::TableTree => 450,
            ErrorKind::Wal => 500,
            ErrorKind::Engine => 600,
        }
    }

    /// Human-readable cause in the requested locale.
    pub const fn describe(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (ErrorKind::Unknown, Locale::En) => "unknown error",
            (ErrorKind::Unknown, Locale::Zh) => "未知错误",
            (ErrorKind::Marshal, Locale::En) => "record encode/decode failure",
            (ErrorKind::Marshal, Locale::Zh) => "记录编解码失败",
            (ErrorKind::Memtable, Locale::En) => "memtable operation failure",
            (ErrorKind::Memtable, Locale::Zh) => "内存表操作失败",
            (ErrorKind::Sstable, Locale::En) => "sstable operation failure",
            (ErrorKind::Sstable, Locale::Zh) => "排序字符串表操作失败",
            (ErrorKind::TableTree, Locale::En) => "table tree operation failure",
            (ErrorKind::TableTree, Locale::Zh) => "表树操作失败",
            (ErrorKind::Wal, Locale::En) => "write-ahead log failure",
            (ErrorKind::Wal, Locale::Zh) => "预写日志失败",
            (ErrorKind::Engine, Locale::En) => "engine operation failure",
            (ErrorKind::Engine, Locale::Zh) => "引擎操作失败",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.describe(Locale::En), self.code())
    }
}

/// Implemented by every subsystem error enum so callers can recover a
/// module-qualified code without matching on the concrete error type.
pub trait Coded {
    /// The subsystem this error originated in.
    fn kind(&self) -> ErrorKind;

    /// Stable numeric code, equivalent to `self.kind().code()`.
    fn code(&self) -> u32 {
        self.kind().code()
    }

    /// Human cause in the requested locale, equivalent to
    /// `self.kind().describe(locale)`.
    fn describe(&self, locale: Locale) -> &'static str {
        self.kind().describe(locale)
    }
}
