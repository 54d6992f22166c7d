//! Record Reader
//!
//! Read-only store handle with an in-memory sparse index for keyset scans.
//! Each execution context opens its own reader; handles are never shared.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, VtError};
use crate::keyset::KeysetReader;

use super::frame::{self, FrameRead};
use super::index::{self, IndexEntry};
use super::recovery::{self, TailStop};
use super::{
    data_path, index_path, Record, StoreSnapshot, DATA_HEADER_SIZE, DEFAULT_INDEX_INTERVAL, FIRST_KEY,
};

/// Read-only handle on a record store
pub struct RecordReader {
    /// Store directory (for logging)
    dir: PathBuf,
    /// Buffered handle on `records.dat`
    file: BufReader<File>,
    /// Sparse index: key → frame offset
    index: BTreeMap<u64, u64>,
    /// Records present when the handle was opened
    count: u64,
    /// Smallest key, if any record exists
    min_key: Option<u64>,
}

impl RecordReader {
    /// Open the store in `dir` for reading
    ///
    /// Loads the sparse index and scans the unindexed tail to learn the
    /// record count. Fails with `StoreUnavailable` when the store does not
    /// exist.
    pub fn open(dir: &Path) -> Result<Self> {
        let data_file_path = data_path(dir);
        if !data_file_path.exists() {
            return Err(VtError::StoreUnavailable(format!(
                "No record file at {}",
                data_file_path.display()
            )));
        }

        let mut file = File::open(&data_file_path)?;
        frame::check_data_header(&mut file)?;
        let data_len = file.metadata()?.len();

        // Entries past the data end belong to writes that never landed
        let (interval, entries): (u32, Vec<IndexEntry>) = match index::load(&index_path(dir))? {
            Some(loaded) => {
                let entries: Vec<IndexEntry> = loaded
                    .entries
                    .into_iter()
                    .take_while(|e| e.offset >= DATA_HEADER_SIZE && e.offset < data_len)
                    .collect();
                (loaded.interval, entries)
            }
            None => (DEFAULT_INDEX_INTERVAL, Vec::new()),
        };

        let scan = recovery::scan_tail(&mut file, &entries, interval)?;
        match scan.stop {
            TailStop::End => {}
            TailStop::Torn => {
                tracing::warn!(
                    "Record file in {} ends with a partial frame; ignoring it",
                    dir.display()
                );
            }
            TailStop::Corrupt(reason) => {
                return Err(VtError::Corruption(reason));
            }
        }

        // Entries the writer has not persisted yet are kept in memory only
        let index: BTreeMap<u64, u64> = entries
            .iter()
            .chain(scan.missing_entries.iter())
            .map(|e| (e.key, e.offset))
            .collect();

        file.seek(SeekFrom::Start(DATA_HEADER_SIZE))?;

        tracing::debug!(
            "Opened record reader on {}: {} records, {} index entries",
            dir.display(),
            scan.record_count,
            index.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            file: BufReader::new(file),
            index,
            count: scan.record_count,
            min_key: scan.first_key,
        })
    }

    /// Number of records (as of open)
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Smallest key, or `None` for an empty store
    pub fn min_key(&self) -> Option<u64> {
        self.min_key
    }

    /// Total-count and first-key snapshot for a session
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::new(self.count, self.min_key.unwrap_or(FIRST_KEY))
    }

    /// Number of sparse index entries held in memory
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Store directory this handle reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ascending scan of at most `limit` records with `key >= start_key`
    ///
    /// Seeks via the sparse index, so the cost does not depend on how deep
    /// `start_key` lies in the store.
    pub fn scan_from(&mut self, start_key: u64, limit: usize) -> Result<Vec<Record>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let offset = self
            .index
            .range(..=start_key)
            .next_back()
            .map(|(_, &offset)| offset)
            .unwrap_or(DATA_HEADER_SIZE);

        self.file.seek(SeekFrom::Start(offset))?;

        let mut rows = Vec::with_capacity(limit.min(4096));
        while rows.len() < limit {
            match frame::read_frame(&mut self.file)? {
                FrameRead::Frame { record, .. } => {
                    if record.key >= start_key {
                        rows.push(record);
                    }
                }
                FrameRead::End | FrameRead::Torn => break,
            }
        }

        Ok(rows)
    }
}

impl KeysetReader for RecordReader {
    fn read_range(&mut self, start_key: u64, limit: usize) -> Result<Vec<Record>> {
        self.scan_from(start_key, limit)
    }
}
