//! Virtual Table Model implementation
//!
//! Combines the chunk cache with the background loader. Every method runs on
//! the consumer thread; the loader thread only ever sees fetch requests.

use std::collections::HashMap;
use std::ops::Range;
use std::time::Duration;

use crate::cache::ChunkCache;
use crate::config::Config;
use crate::error::Result;
use crate::loader::{ChunkLoaded, ChunkLoader, LoaderStats};
use crate::store::{Record, RecordReader, StoreSnapshot};

use super::{CellValue, Column, ModelEvent, RowRange};

/// Position-addressable view over the record store
///
/// `total_rows` and `first_key` are fixed when the model is built. Rows
/// appended to the store afterwards are not visible to this model.
pub struct VirtualTableModel {
    /// Extent of the store when the model was built
    snapshot: StoreSnapshot,
    /// Resident windows and in-flight fetches
    cache: ChunkCache,
    /// Background reader
    loader: ChunkLoader,
    /// Windows whose last fetch failed, with the error text
    failed: HashMap<u64, String>,
}

impl VirtualTableModel {
    /// Open a model over the record store in `config.data_dir`
    ///
    /// Takes the count/first-key snapshot through a short-lived reader on the
    /// calling thread, then starts the loader with its own handle.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let snapshot = RecordReader::open(&config.data_dir)?.snapshot();
        tracing::info!(
            "Opening table over {}: {} rows, first key {}",
            config.data_dir.display(),
            snapshot.total_rows,
            snapshot.first_key
        );

        let loader = ChunkLoader::for_store(config.data_dir.clone(), snapshot)?;
        Ok(Self::with_loader(
            snapshot,
            loader,
            config.window_size,
            config.cache_capacity,
        ))
    }

    /// Build a model around an already running loader
    ///
    /// The loader must have been spawned with the same `snapshot`.
    pub fn with_loader(
        snapshot: StoreSnapshot,
        loader: ChunkLoader,
        window_size: usize,
        cache_capacity: usize,
    ) -> Self {
        debug_assert_eq!(loader.snapshot(), snapshot);
        Self {
            snapshot,
            cache: ChunkCache::new(window_size, cache_capacity),
            loader,
            failed: HashMap::new(),
        }
    }

    // =========================================================================
    // Table Shape
    // =========================================================================

    /// Number of rows, fixed at construction
    pub fn total_rows(&self) -> u64 {
        self.snapshot.total_rows
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        Column::ALL.len()
    }

    /// Horizontal header label
    pub fn column_header(&self, column: Column) -> &'static str {
        column.header()
    }

    /// Vertical header label: rows are numbered from 1
    pub fn row_header(&self, position: u64) -> u64 {
        self.check_position(position);
        position + 1
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot
    }

    // =========================================================================
    // Cell Access
    // =========================================================================

    /// Cell at (`position`, `column`), or `None` if its window is not loaded
    ///
    /// A `None` means a fetch has been (or already was) queued and a
    /// `RowsChanged` covering this row will follow. Never blocks.
    ///
    /// Panics if `position >= total_rows()`.
    pub fn get_cell(&mut self, position: u64, column: Column) -> Option<CellValue> {
        self.get_record(position)
            .map(|record| CellValue::from_record(record, column))
    }

    /// Whole record at `position`, with the same miss behaviour as `get_cell`
    pub fn get_record(&mut self, position: u64) -> Option<&Record> {
        self.check_position(position);

        let window_start = self.cache.window_start(position);
        if self.cache.contains(window_start) {
            return self.cache.lookup(position);
        }

        self.request_window(window_start);
        None
    }

    /// Record at `position` if resident; never queues a fetch
    pub fn cached_record(&self, position: u64) -> Option<&Record> {
        self.check_position(position);
        self.cache.lookup(position)
    }

    /// Queue fetches for every window overlapping `rows`
    pub fn prefetch(&mut self, rows: Range<u64>) {
        let end = rows.end.min(self.snapshot.total_rows);
        if rows.start >= end {
            return;
        }

        let mut window_start = self.cache.window_start(rows.start);
        while window_start < end {
            self.request_window(window_start);
            window_start += self.cache.window_size() as u64;
        }
    }

    // =========================================================================
    // Fetch Completion
    // =========================================================================

    /// Apply every fetch result that has arrived, without waiting
    pub fn process_completions(&mut self) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        while let Some(loaded) = self.loader.try_recv() {
            events.extend(self.apply(loaded));
        }
        events
    }

    /// Wait up to `timeout` for a fetch result, then apply all that arrived
    pub fn wait_for_completions(&mut self, timeout: Duration) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        if let Some(loaded) = self.loader.recv_timeout(timeout) {
            events.extend(self.apply(loaded));
        }
        events.extend(self.process_completions());
        events
    }

    /// Forget failed fetches so the next miss in those windows fetches again
    ///
    /// Returns how many windows were cleared.
    pub fn retry_failed(&mut self) -> usize {
        let cleared = self.failed.len();
        self.failed.clear();
        cleared
    }

    /// Windows whose last fetch failed
    pub fn failed_windows(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.failed.iter().map(|(&start, error)| (start, error.as_str()))
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    pub fn loader_stats(&self) -> LoaderStats {
        self.loader.stats()
    }

    /// Stop the loader and wait until it has released its store handle
    pub fn close(self) -> Result<()> {
        tracing::debug!(
            "Closing table model ({} windows resident, {} pending)",
            self.cache.len(),
            self.cache.pending_len()
        );
        self.loader.close()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_position(&self, position: u64) {
        assert!(
            position < self.snapshot.total_rows,
            "row {} out of range (total_rows = {})",
            position,
            self.snapshot.total_rows
        );
    }

    fn request_window(&mut self, window_start: u64) {
        if self.failed.contains_key(&window_start) || window_start >= self.snapshot.total_rows {
            return;
        }
        if !self.cache.begin_fetch(window_start) {
            return;
        }

        tracing::trace!("Requesting window {}", window_start);
        if let Err(e) = self.loader.request(window_start, self.cache.window_size()) {
            tracing::warn!("Could not queue window {}: {}", window_start, e);
            self.cache.cancel_fetch(window_start);
            self.failed.insert(window_start, e.to_string());
        }
    }

    fn apply(&mut self, loaded: ChunkLoaded) -> Option<ModelEvent> {
        let window_start = loaded.window_start;
        match loaded.result {
            Ok(rows) => {
                let row_count = rows.len() as u64;
                self.failed.remove(&window_start);
                self.cache.complete_fetch(window_start, rows);

                if row_count == 0 || window_start >= self.snapshot.total_rows {
                    return None;
                }
                let last = (window_start + row_count - 1).min(self.snapshot.total_rows - 1);
                Some(ModelEvent::RowsChanged(RowRange::new(window_start, last)))
            }
            Err(error) => {
                self.cache.cancel_fetch(window_start);
                self.failed.insert(window_start, error.clone());
                Some(ModelEvent::FetchFailed {
                    window_start,
                    error,
                })
            }
        }
    }
}
