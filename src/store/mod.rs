//! Store Module
//!
//! Append-only, file-backed record store. This is the backing store the
//! chunk loader reads through `KeysetReader`.
//!
//! ## Responsibilities
//! - Assign dense, strictly increasing keys at append time
//! - Bounded ascending range scans (`key >= X ORDER BY key LIMIT N`)
//! - Total-count and minimum-key queries
//! - Recover from torn trailing writes on writer open
//!
//! ## File Format
//! ```text
//! records.dat
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (6 bytes)                                        │
//! │   Magic: "VTRS" (4) | Version: u16 (2)                  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Frames (variable)                                       │
//! │   [Len: u32][CRC32: u32][bincode(Record)]               │
//! │   ... one per record, ascending key order ...           │
//! └─────────────────────────────────────────────────────────┘
//!
//! records.idx
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (10 bytes)                                       │
//! │   Magic: "VTIX" (4) | Version: u16 (2) | Interval: u32  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Entries (16 bytes each)                                 │
//! │   [Key: u64][FrameOffset: u64]                          │
//! │   ... first record, then every interval-th record ...   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A range scan seeks through the sparse index to the closest indexed key at
//! or below the seek key, so it never decodes more than
//! `interval - 1 + limit` frames no matter how deep the seek key lies.

mod frame;
mod index;
mod reader;
mod recovery;
mod writer;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use reader::RecordReader;
pub use recovery::{RecoveryResult, StoreRecovery};
pub use writer::RecordWriter;

// =============================================================================
// Shared Constants (used by frame, index, reader, writer, recovery)
// =============================================================================

/// Magic bytes identifying a VTable record file
pub(crate) const DATA_MAGIC: &[u8; 4] = b"VTRS";

/// Magic bytes identifying a VTable sparse index file
pub(crate) const INDEX_MAGIC: &[u8; 4] = b"VTIX";

/// Current on-disk format version (both files)
pub(crate) const VERSION: u16 = 1;

/// Data header size: Magic (4) + Version (2) = 6 bytes
pub(crate) const DATA_HEADER_SIZE: u64 = 6;

/// Index header size: Magic (4) + Version (2) + Interval (4) = 10 bytes
pub(crate) const INDEX_HEADER_SIZE: u64 = 10;

/// Index entry size: Key (8) + Offset (8) = 16 bytes
pub(crate) const INDEX_ENTRY_SIZE: u64 = 16;

/// Frame header size: Len (4) + CRC32 (4) = 8 bytes
pub(crate) const FRAME_HEADER_SIZE: usize = 8;

/// Largest payload a frame may declare (16 MB)
pub(crate) const MAX_FRAME_PAYLOAD: u32 = 16 * 1024 * 1024;

/// Sparse index interval used when no index file exists yet
pub const DEFAULT_INDEX_INTERVAL: u32 = 128;

/// Key assigned to the first record of an empty store
pub const FIRST_KEY: u64 = 1;

const DATA_FILENAME: &str = "records.dat";
const INDEX_FILENAME: &str = "records.idx";

/// Path of the record file inside a store directory
pub fn data_path(dir: &Path) -> PathBuf {
    dir.join(DATA_FILENAME)
}

/// Path of the sparse index file inside a store directory
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILENAME)
}

// =============================================================================
// Record
// =============================================================================

/// A single immutable row of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned key (dense, strictly increasing)
    pub key: u64,

    /// Row payload
    pub value: String,
}

impl Record {
    pub fn new(key: u64, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time view of the store's extent, taken once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Number of records in the store
    pub total_rows: u64,

    /// Smallest key (`FIRST_KEY` for an empty store)
    pub first_key: u64,
}

impl StoreSnapshot {
    pub fn new(total_rows: u64, first_key: u64) -> Self {
        Self {
            total_rows,
            first_key,
        }
    }

    /// Key of the record at absolute row `position`.
    ///
    /// Precondition: keys are dense and start at `first_key` with no gaps.
    /// The store is append-only and never deletes, so this holds for every
    /// snapshot taken after seeding finished.
    pub fn key_for(&self, position: u64) -> u64 {
        self.first_key + position
    }
}
