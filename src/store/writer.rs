//! Record Writer
//!
//! Appends records to the store, assigning keys and maintaining the sparse
//! index. Only one writer may be open on a store at a time.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{Result, VtError};

use super::frame;
use super::index::IndexEntry;
use super::recovery::{RecoveryResult, StoreRecovery};
use super::{data_path, index_path, Record, FIRST_KEY};

/// Appends records to the store
pub struct RecordWriter {
    /// Store directory
    dir: PathBuf,
    /// Buffered append handle on `records.dat`
    data: BufWriter<File>,
    /// Buffered append handle on `records.idx`
    index: BufWriter<File>,
    /// Offset the next frame will be written at
    data_offset: u64,
    /// Records in the store
    count: u64,
    /// Key the next record receives
    next_key: u64,
    /// Sparse index interval (from the index file)
    interval: u32,
    sync_strategy: SyncStrategy,
    /// What recovery found when this writer opened
    recovery: RecoveryResult,
}

impl RecordWriter {
    /// Open or create the store in `dir`
    ///
    /// Runs recovery first, so a store left with a torn tail by a crash is
    /// cut back to its last whole record before anything is appended.
    pub fn open(dir: &Path, index_interval: u32, sync_strategy: SyncStrategy) -> Result<Self> {
        if index_interval == 0 {
            return Err(VtError::Config("index_interval must be at least 1".to_string()));
        }

        let recovery = StoreRecovery::recover(dir, index_interval)?;
        if recovery.index_interval != index_interval {
            tracing::debug!(
                "Store in {} keeps its index interval {} (requested {})",
                dir.display(),
                recovery.index_interval,
                index_interval
            );
        }

        let data = OpenOptions::new().append(true).open(data_path(dir))?;
        let index = OpenOptions::new().append(true).open(index_path(dir))?;

        let next_key = recovery.last_key.map(|k| k + 1).unwrap_or(FIRST_KEY);

        Ok(Self {
            dir: dir.to_path_buf(),
            data: BufWriter::new(data),
            index: BufWriter::new(index),
            data_offset: recovery.data_len,
            count: recovery.record_count,
            next_key,
            interval: recovery.index_interval,
            sync_strategy,
            recovery,
        })
    }

    /// Append one batch of values, returning the keys they received
    ///
    /// The batch is flushed before returning, and synced to disk under
    /// `SyncStrategy::EveryBatch`. An empty batch returns `None`.
    pub fn append_batch<I, S>(&mut self, values: I) -> Result<Option<RangeInclusive<u64>>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let first = self.next_key;

        for value in values {
            let record = Record::new(self.next_key, value);
            let bytes = frame::encode_frame(&record)?;

            if self.count % self.interval as u64 == 0 {
                let entry = IndexEntry {
                    key: record.key,
                    offset: self.data_offset,
                };
                self.index.write_all(&entry.encode())?;
            }

            self.data.write_all(&bytes)?;
            self.data_offset += bytes.len() as u64;
            self.count += 1;
            self.next_key += 1;
        }

        if self.next_key == first {
            return Ok(None);
        }

        // Data before index, so a durable index entry never outruns its frame
        self.data.flush()?;
        if self.sync_strategy == SyncStrategy::EveryBatch {
            self.data.get_ref().sync_data()?;
        }
        self.index.flush()?;
        if self.sync_strategy == SyncStrategy::EveryBatch {
            self.index.get_ref().sync_data()?;
        }

        Ok(Some(first..=self.next_key - 1))
    }

    /// Force everything appended so far to disk
    pub fn sync(&mut self) -> Result<()> {
        self.data.flush()?;
        self.data.get_ref().sync_all()?;
        self.index.flush()?;
        self.index.get_ref().sync_all()?;
        Ok(())
    }

    /// Flush, sync and release the store files
    pub fn close(mut self) -> Result<()> {
        self.sync()?;
        tracing::debug!(
            "Closed record writer on {} at {} records",
            self.dir.display(),
            self.count
        );
        Ok(())
    }

    /// Number of records in the store
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Key the next appended record will receive
    pub fn next_key(&self) -> u64 {
        self.next_key
    }

    /// Sparse index interval in effect
    pub fn index_interval(&self) -> u32 {
        self.interval
    }

    /// What recovery found when this writer was opened
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }
}
