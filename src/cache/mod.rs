//! Cache Module
//!
//! In-memory windows of the dataset, keyed by window start position.
//!
//! ## Responsibilities
//! - Map absolute row positions to resident windows
//! - Track windows whose fetch is in flight (no duplicate requests)
//! - Bound memory with FIFO eviction by insertion order
//!
//! ## Eviction Choice
//! FIFO by insertion, not LRU: while scrolling sequentially the window
//! inserted first is also the one looked at longest ago, and FIFO needs no
//! per-access bookkeeping. Scrolling back to a window that was viewed
//! recently but inserted early re-fetches it.

mod chunk_cache;

pub use chunk_cache::ChunkCache;

use crate::store::Record;

/// A contiguous run of records starting at an absolute row position
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Absolute position of `rows[0]` (a multiple of the window size)
    pub start: u64,

    /// Records for positions `start..start + rows.len()`
    pub rows: Vec<Record>,
}

impl Window {
    pub fn new(start: u64, rows: Vec<Record>) -> Self {
        Self { start, rows }
    }

    /// Record at absolute `position`, if this window covers it
    pub fn get(&self, position: u64) -> Option<&Record> {
        let offset = position.checked_sub(self.start)?;
        self.rows.get(usize::try_from(offset).ok()?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
