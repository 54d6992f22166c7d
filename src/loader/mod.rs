//! Loader Module
//!
//! A single background thread that serializes every store read.
//!
//! ## Architecture
//! ```text
//!   consumer thread                      "chunk-loader" thread
//!  ┌────────────────┐  LoaderCommand   ┌─────────────────────────┐
//!  │ VirtualTable   │ ───────────────▶ │ owns the only store     │
//!  │ Model          │   (unbounded)    │ handle; KeysetReader    │
//!  │                │ ◀─────────────── │ read per request        │
//!  └────────────────┘   ChunkLoaded    └─────────────────────────┘
//! ```
//!
//! - Requests are served strictly in arrival order
//! - The store handle is opened inside the worker and never leaves it
//! - `Close` travels through the same queue as fetches; the owner joins
//!   the thread before the store files may be removed

mod worker;

pub use worker::ChunkLoader;

use crate::store::Record;

/// A window fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute row position of the window
    pub window_start: u64,

    /// Max rows to read
    pub limit: usize,
}

/// Result of one fetch, delivered back to the consumer thread
#[derive(Debug, Clone)]
pub struct ChunkLoaded {
    /// Window the request was for
    pub window_start: u64,

    /// Rows in key order, or the store error as text
    pub result: std::result::Result<Vec<Record>, String>,
}

/// Commands accepted by the loader thread
#[derive(Debug)]
pub(crate) enum LoaderCommand {
    Fetch(FetchRequest),
    Close,
}

/// Counters kept by the loader thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Fetch requests served (success or failure)
    pub requests: u64,

    /// Records read across all successful fetches
    pub rows_read: u64,

    /// Fetches that failed (open or read)
    pub failures: u64,

    /// Times the store handle was opened
    pub handle_opens: u64,
}
