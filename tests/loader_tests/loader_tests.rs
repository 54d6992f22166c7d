//! Tests for ChunkLoader
//!
//! These tests verify:
//! - Windows are read by keyset from the snapshot key of `window_start`
//! - Requests are served in arrival order on one thread
//! - Store failures come back as results and the handle is reopened
//! - Close joins the worker and releases its store handle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use vtable::loader::{ChunkLoaded, ChunkLoader, LoaderStats};
use vtable::store::{Record, RecordWriter, StoreSnapshot};
use vtable::{KeysetReader, Result, SyncStrategy, VtError};

const TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Helper Functions
// =============================================================================

/// In-memory store whose value for key `k` is derived from `k`
struct SyntheticStore {
    first_key: u64,
    total_rows: u64,
    /// Reads left to fail before reads succeed
    failing_reads: Arc<AtomicUsize>,
    /// Live handles
    live: Arc<AtomicUsize>,
}

impl SyntheticStore {
    fn open(
        first_key: u64,
        total_rows: u64,
        failing_reads: &Arc<AtomicUsize>,
        live: &Arc<AtomicUsize>,
    ) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            first_key,
            total_rows,
            failing_reads: Arc::clone(failing_reads),
            live: Arc::clone(live),
        }
    }
}

impl KeysetReader for SyntheticStore {
    fn read_range(&mut self, start_key: u64, limit: usize) -> Result<Vec<Record>> {
        let failing = self.failing_reads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_reads.store(failing - 1, Ordering::SeqCst);
            return Err(VtError::Storage("injected read failure".to_string()));
        }

        let end = self.first_key + self.total_rows;
        Ok((start_key.max(self.first_key)..end)
            .take(limit)
            .map(|k| Record::new(k, synthetic_value(k)))
            .collect())
    }
}

impl Drop for SyntheticStore {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn synthetic_value(key: u64) -> String {
    format!("value-{}", key)
}

fn synthetic_loader(first_key: u64, total_rows: u64) -> (ChunkLoader, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let failing = Arc::new(AtomicUsize::new(0));
    let live = Arc::new(AtomicUsize::new(0));
    let (f, l) = (Arc::clone(&failing), Arc::clone(&live));
    let loader = ChunkLoader::spawn(StoreSnapshot::new(total_rows, first_key), move || {
        Ok(SyntheticStore::open(first_key, total_rows, &f, &l))
    })
    .unwrap();
    (loader, failing, live)
}

fn next(loader: &ChunkLoader) -> ChunkLoaded {
    loader.recv_timeout(TIMEOUT).expect("no completion within timeout")
}

// =============================================================================
// Fetch Tests
// =============================================================================

#[test]
fn test_window_read_from_disk_store() {
    let temp_dir = TempDir::new().unwrap();
    let mut writer = RecordWriter::open(temp_dir.path(), 8, SyncStrategy::EveryBatch).unwrap();
    writer
        .append_batch((1..=50).map(|k| format!("disk-{}", k)))
        .unwrap();
    writer.close().unwrap();

    let loader = ChunkLoader::for_store(temp_dir.path(), StoreSnapshot::new(50, 1)).unwrap();
    loader.request(20, 10).unwrap();

    let loaded = next(&loader);
    assert_eq!(loaded.window_start, 20);
    let rows = loaded.result.unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0], Record::new(21, "disk-21"));
    assert_eq!(rows[9].key, 30);

    loader.close().unwrap();
}

#[test]
fn test_deep_window_in_three_million_rows() {
    let (loader, _, _) = synthetic_loader(1, 3_000_000);

    loader.request(2_500_000, 1000).unwrap();

    let loaded = next(&loader);
    assert_eq!(loaded.window_start, 2_500_000);
    let rows = loaded.result.unwrap();
    assert_eq!(rows.len(), 1000);
    assert_eq!(rows.first().unwrap().key, 2_500_001);
    assert_eq!(rows.last().unwrap().key, 2_501_000);
    assert_eq!(rows[500].value, synthetic_value(2_500_501));
}

#[test]
fn test_first_key_offsets_positions() {
    let (loader, _, _) = synthetic_loader(1000, 100);
    assert_eq!(loader.snapshot(), StoreSnapshot::new(100, 1000));
    assert_eq!(loader.snapshot().key_for(10), 1010);

    loader.request(10, 5).unwrap();

    let rows = next(&loader).result.unwrap();
    let keys: Vec<u64> = rows.iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![1010, 1011, 1012, 1013, 1014]);
}

#[test]
fn test_last_window_is_short() {
    let (loader, _, _) = synthetic_loader(1, 95);

    loader.request(90, 10).unwrap();

    assert_eq!(next(&loader).result.unwrap().len(), 5);
}

#[test]
fn test_requests_served_in_arrival_order() {
    let (loader, _, _) = synthetic_loader(1, 10_000);

    for start in [5000, 0, 9000, 100] {
        loader.request(start, 10).unwrap();
    }

    let order: Vec<u64> = (0..4).map(|_| next(&loader).window_start).collect();
    assert_eq!(order, vec![5000, 0, 9000, 100]);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_missing_store_reports_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("missing");

    let loader = ChunkLoader::for_store(&dir, StoreSnapshot::new(0, 1)).unwrap();
    loader.request(0, 10).unwrap();

    let loaded = next(&loader);
    let error = loaded.result.unwrap_err();
    assert!(error.contains("unavailable"), "unexpected error: {}", error);

    // Created afterwards: the next request opens it
    let mut writer = RecordWriter::open(&dir, 8, SyncStrategy::EveryBatch).unwrap();
    writer.append_batch(vec!["late"]).unwrap();
    writer.close().unwrap();

    loader.request(0, 10).unwrap();
    let rows = next(&loader).result.unwrap();
    assert_eq!(rows, vec![Record::new(1, "late")]);

    let stats = loader.stats();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.handle_opens, 1);
}

#[test]
fn test_read_failure_reopens_handle() {
    let (loader, failing, live) = synthetic_loader(1, 100);
    failing.store(1, Ordering::SeqCst);

    loader.request(0, 10).unwrap();
    assert!(next(&loader).result.is_err());

    loader.request(0, 10).unwrap();
    assert_eq!(next(&loader).result.unwrap().len(), 10);

    assert_eq!(
        loader.stats(),
        LoaderStats {
            requests: 2,
            rows_read: 10,
            failures: 1,
            handle_opens: 2,
        }
    );
    assert_eq!(live.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_handle_opened_lazily() {
    let (loader, _, live) = synthetic_loader(1, 100);

    assert_eq!(live.load(Ordering::SeqCst), 0);
    assert_eq!(loader.stats().handle_opens, 0);

    loader.request(0, 1).unwrap();
    next(&loader);

    assert_eq!(live.load(Ordering::SeqCst), 1);
    assert_eq!(loader.stats().handle_opens, 1);
}

#[test]
fn test_close_releases_store_handle() {
    let (loader, _, live) = synthetic_loader(1, 100);
    loader.request(0, 10).unwrap();
    next(&loader);

    loader.close().unwrap();

    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_drop_releases_store_handle() {
    let (loader, _, live) = synthetic_loader(1, 100);
    loader.request(0, 10).unwrap();
    loader.request(10, 10).unwrap();

    drop(loader);

    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_store_directory_removable_after_close() {
    let temp_dir = TempDir::new().unwrap();
    let mut writer = RecordWriter::open(temp_dir.path(), 8, SyncStrategy::EveryBatch).unwrap();
    writer.append_batch(vec!["a", "b"]).unwrap();
    writer.close().unwrap();

    let loader = ChunkLoader::for_store(temp_dir.path(), StoreSnapshot::new(2, 1)).unwrap();
    loader.request(0, 2).unwrap();
    next(&loader);
    loader.close().unwrap();

    temp_dir.close().unwrap();
}
