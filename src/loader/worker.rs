//! Chunk Loader worker
//!
//! Owns the background thread and the channels to and from it.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{Result, VtError};
use crate::keyset::KeysetReader;
use crate::store::{Record, RecordReader, StoreSnapshot};

use super::{ChunkLoaded, FetchRequest, LoaderCommand, LoaderStats};

/// Background chunk loader
///
/// ## Concurrency:
/// - `commands`: unbounded, ordered queue into the worker
/// - `completions`: results back to whoever owns the loader
/// - `stats`: the only state both sides touch, behind a Mutex
pub struct ChunkLoader {
    /// Queue into the worker
    commands: Sender<LoaderCommand>,
    /// Results from the worker
    completions: Receiver<ChunkLoaded>,
    /// Counters updated by the worker
    stats: Arc<Mutex<LoaderStats>>,
    /// Worker thread (None once joined)
    handle: Option<JoinHandle<()>>,
    /// Store extent; maps row positions to seek keys
    snapshot: StoreSnapshot,
}

impl ChunkLoader {
    /// Spawn a loader whose store handle comes from `open`
    ///
    /// `open` runs on the worker thread, lazily, before the first read and
    /// again after any failed read. Whatever it returns never leaves that
    /// thread.
    pub fn spawn<R, F>(snapshot: StoreSnapshot, open: F) -> Result<Self>
    where
        R: KeysetReader + 'static,
        F: FnMut() -> Result<R> + Send + 'static,
    {
        let (command_tx, command_rx) = channel::unbounded();
        let (completion_tx, completion_rx) = channel::unbounded();
        let stats = Arc::new(Mutex::new(LoaderStats::default()));

        let worker_stats = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("chunk-loader".to_string())
            .spawn(move || worker_loop(snapshot, open, command_rx, completion_tx, worker_stats))?;

        Ok(Self {
            commands: command_tx,
            completions: completion_rx,
            stats,
            handle: Some(handle),
            snapshot,
        })
    }

    /// Spawn a loader reading the record store in `dir`
    pub fn for_store(dir: impl Into<PathBuf>, snapshot: StoreSnapshot) -> Result<Self> {
        let dir = dir.into();
        Self::spawn(snapshot, move || RecordReader::open(&dir))
    }

    /// Queue a fetch of `limit` rows starting at absolute row `window_start`
    pub fn request(&self, window_start: u64, limit: usize) -> Result<()> {
        self.commands
            .send(LoaderCommand::Fetch(FetchRequest {
                window_start,
                limit,
            }))
            .map_err(|_| VtError::WorkerClosed("chunk loader stopped".to_string()))
    }

    /// Next finished fetch, if one is waiting
    pub fn try_recv(&self) -> Option<ChunkLoaded> {
        self.completions.try_recv().ok()
    }

    /// Wait up to `timeout` for the next finished fetch
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChunkLoaded> {
        match self.completions.recv_timeout(timeout) {
            Ok(loaded) => Some(loaded),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Snapshot of the worker's counters
    pub fn stats(&self) -> LoaderStats {
        self.stats.lock().clone()
    }

    /// Snapshot the loader maps positions through
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot
    }

    /// Stop the worker and wait for it to release its store handle
    ///
    /// Requests queued before the close are still served; their results are
    /// dropped with the loader.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // The worker may already be gone (its completion receiver dropped)
        let _ = self.commands.send(LoaderCommand::Close);

        handle
            .join()
            .map_err(|_| VtError::WorkerClosed("chunk loader panicked".to_string()))?;
        tracing::debug!("Chunk loader joined");
        Ok(())
    }
}

impl Drop for ChunkLoader {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Chunk loader shutdown failed: {}", e);
        }
    }
}

// =============================================================================
// Worker Thread
// =============================================================================

fn worker_loop<R, F>(
    snapshot: StoreSnapshot,
    mut open: F,
    commands: Receiver<LoaderCommand>,
    completions: Sender<ChunkLoaded>,
    stats: Arc<Mutex<LoaderStats>>,
) where
    R: KeysetReader,
    F: FnMut() -> Result<R>,
{
    let mut reader: Option<R> = None;

    for command in commands.iter() {
        let request = match command {
            LoaderCommand::Fetch(request) => request,
            LoaderCommand::Close => break,
        };

        let start_key = snapshot.key_for(request.window_start);
        let result = fetch(&mut reader, &mut open, &stats, start_key, request.limit);

        {
            let mut stats = stats.lock();
            stats.requests += 1;
            match &result {
                Ok(rows) => stats.rows_read += rows.len() as u64,
                Err(_) => stats.failures += 1,
            }
        }

        let result = match result {
            Ok(rows) => {
                tracing::debug!(
                    "Loaded window {} ({} rows from key {})",
                    request.window_start,
                    rows.len(),
                    start_key
                );
                Ok(rows)
            }
            Err(e) => {
                tracing::warn!("Fetch of window {} failed: {}", request.window_start, e);
                // Reopen on the next request; the handle may be the problem
                reader = None;
                Err(e.to_string())
            }
        };

        let loaded = ChunkLoaded {
            window_start: request.window_start,
            result,
        };
        if completions.send(loaded).is_err() {
            // Owner dropped its receiver; nobody is listening any more
            break;
        }
    }

    let had_handle = reader.is_some();
    drop(reader);
    tracing::debug!("Chunk loader exiting (store handle released: {})", had_handle);
}

fn fetch<R, F>(
    reader: &mut Option<R>,
    open: &mut F,
    stats: &Mutex<LoaderStats>,
    start_key: u64,
    limit: usize,
) -> Result<Vec<Record>>
where
    R: KeysetReader,
    F: FnMut() -> Result<R>,
{
    if reader.is_none() {
        let opened = match open() {
            Ok(opened) => opened,
            Err(e @ VtError::StoreUnavailable(_)) => return Err(e),
            Err(e) => return Err(VtError::StoreUnavailable(e.to_string())),
        };
        stats.lock().handle_opens += 1;
        *reader = Some(opened);
    }

    match reader.as_mut() {
        Some(reader) => reader.read_range(start_key, limit),
        None => Err(VtError::StoreUnavailable("store handle not open".to_string())),
    }
}
