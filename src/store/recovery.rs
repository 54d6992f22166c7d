//! Store Recovery
//!
//! Brings a store directory back to a consistent state before a writer
//! appends to it, and provides the tail scan readers use to count records.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, VtError};

use super::frame::{self, FrameRead};
use super::index::{self, IndexEntry};
use super::{data_path, index_path, DATA_HEADER_SIZE};

/// Handles store recovery after an interrupted write
pub struct StoreRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone)]
pub struct RecoveryResult {
    /// Whole records present after recovery
    pub record_count: u64,

    /// Smallest key, if any record exists
    pub first_key: Option<u64>,

    /// Largest key, if any record exists
    pub last_key: Option<u64>,

    /// Length of `records.dat` after recovery
    pub data_len: u64,

    /// Interval recorded in `records.idx`
    pub index_interval: u32,

    /// Sparse index entries after recovery
    pub index_entries: Vec<(u64, u64)>,

    /// Index entries recreated from the data file
    pub index_entries_rebuilt: u64,

    /// Bytes cut from the end of `records.dat` (partial or corrupt frames)
    pub bytes_truncated: u64,
}

/// How a tail scan ended
#[derive(Debug)]
pub(crate) enum TailStop {
    /// Clean end of file
    End,
    /// Partial frame at the end of the file
    Torn,
    /// Checksum/decoding failure or out-of-order key
    Corrupt(String),
}

/// Outcome of scanning the unindexed tail of the data file
#[derive(Debug)]
pub(crate) struct TailScan {
    /// Records from ordinal 0 through the last whole frame
    pub record_count: u64,
    pub first_key: Option<u64>,
    pub last_key: Option<u64>,
    /// Offset just past the last whole frame
    pub end_offset: u64,
    /// Index entries the scan found missing
    pub missing_entries: Vec<IndexEntry>,
    pub stop: TailStop,
}

impl StoreRecovery {
    /// Recover the store in `dir`, creating it if needed
    ///
    /// This will:
    /// 1. Create both files with headers if they do not exist
    /// 2. Drop index entries that point past the data or at the wrong frame
    /// 3. Scan frames after the last index entry, re-adding missing entries
    /// 4. Truncate a torn or corrupt tail of `records.dat`
    pub fn recover(dir: &Path, default_interval: u32) -> Result<RecoveryResult> {
        fs::create_dir_all(dir)?;
        let data_file_path = data_path(dir);
        let index_file_path = index_path(dir);

        // Step 1: record file, created or header-checked
        let mut data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&data_file_path)?;

        if data.metadata()?.len() < DATA_HEADER_SIZE {
            // Missing or torn header: nothing durable was ever appended.
            data.set_len(0)?;
            data.seek(SeekFrom::Start(0))?;
            frame::write_data_header(&mut data)?;
            data.sync_all()?;
        } else {
            data.seek(SeekFrom::Start(0))?;
            frame::check_data_header(&mut data)?;
        }
        let data_len = data.metadata()?.len();

        // Step 2: sparse index, validated against the data file
        let (interval, mut entries, mut index_dirty) = match index::load(&index_file_path)? {
            Some(loaded) => {
                let expected_len = super::INDEX_HEADER_SIZE
                    + loaded.entries.len() as u64 * super::INDEX_ENTRY_SIZE;
                let dirty = fs::metadata(&index_file_path)?.len() != expected_len;
                (loaded.interval, loaded.entries, dirty)
            }
            None => (default_interval, Vec::new(), true),
        };

        let valid = entries
            .iter()
            .take_while(|e| e.offset >= DATA_HEADER_SIZE && e.offset < data_len)
            .count();
        if valid < entries.len() {
            entries.truncate(valid);
            index_dirty = true;
        }

        while let Some(last) = entries.last().copied() {
            data.seek(SeekFrom::Start(last.offset))?;
            match frame::read_frame(&mut data) {
                Ok(FrameRead::Frame { record, .. }) if record.key == last.key => break,
                _ => {
                    entries.pop();
                    index_dirty = true;
                }
            }
        }

        // Step 3: scan the tail
        let scan = scan_tail(&mut data, &entries, interval)?;
        if let TailStop::Corrupt(reason) = &scan.stop {
            tracing::warn!("Store tail corrupt at offset {}: {}", scan.end_offset, reason);
        }

        let rebuilt = scan.missing_entries.len() as u64;
        if rebuilt > 0 {
            entries.extend(scan.missing_entries.iter().copied());
            index_dirty = true;
        }

        // Step 4: cut whatever follows the last whole frame
        let bytes_truncated = data_len - scan.end_offset;
        if bytes_truncated > 0 {
            data.set_len(scan.end_offset)?;
            data.sync_all()?;
        }

        if index_dirty {
            rewrite_index(&index_file_path, interval, &entries)?;
        }

        if bytes_truncated > 0 || rebuilt > 0 {
            tracing::info!(
                "Store recovery: {} records, {} bytes truncated, {} index entries rebuilt",
                scan.record_count,
                bytes_truncated,
                rebuilt
            );
        }

        Ok(RecoveryResult {
            record_count: scan.record_count,
            first_key: scan.first_key,
            last_key: scan.last_key,
            data_len: scan.end_offset,
            index_interval: interval,
            index_entries: entries.iter().map(|e| (e.key, e.offset)).collect(),
            index_entries_rebuilt: rebuilt,
            bytes_truncated,
        })
    }
}

/// Scan frames from the last index entry (or the data header) to the end
///
/// `entries` must hold index entries for ordinals `0, interval, 2*interval, ...`
/// with no gaps; the scan reports the ones it finds missing after them.
pub(crate) fn scan_tail(data: &mut File, entries: &[IndexEntry], interval: u32) -> Result<TailScan> {
    let interval = interval as u64;
    let (start_offset, mut ordinal) = match entries.last() {
        Some(last) => (last.offset, (entries.len() as u64 - 1) * interval),
        None => (DATA_HEADER_SIZE, 0),
    };

    data.seek(SeekFrom::Start(start_offset))?;
    let mut reader = BufReader::new(&mut *data);

    let mut first_key = entries.first().map(|e| e.key);
    let mut last_key = None;
    let mut offset = start_offset;
    let mut missing_entries = Vec::new();
    let next_indexed = entries.len() as u64;

    let stop = loop {
        let (record, len) = match frame::read_frame(&mut reader) {
            Ok(FrameRead::Frame { record, len }) => (record, len),
            Ok(FrameRead::End) => break TailStop::End,
            Ok(FrameRead::Torn) => break TailStop::Torn,
            Err(VtError::Io(e)) => return Err(VtError::Io(e)),
            Err(e) => break TailStop::Corrupt(e.to_string()),
        };

        if last_key.is_none() {
            if let Some(indexed) = entries.last() {
                if record.key != indexed.key {
                    break TailStop::Corrupt(format!(
                        "Index entry for key {} points at key {}",
                        indexed.key, record.key
                    ));
                }
            }
        }

        if let Some(prev) = last_key {
            if record.key <= prev {
                break TailStop::Corrupt(format!(
                    "Key {} does not follow key {}",
                    record.key, prev
                ));
            }
        }

        if ordinal % interval == 0 && ordinal / interval >= next_indexed {
            missing_entries.push(IndexEntry {
                key: record.key,
                offset,
            });
        }

        first_key.get_or_insert(record.key);
        last_key = Some(record.key);
        offset += len;
        ordinal += 1;
    };

    Ok(TailScan {
        record_count: ordinal,
        first_key,
        last_key,
        end_offset: offset,
        missing_entries,
        stop,
    })
}

/// Replace the index file with `entries`
fn rewrite_index(path: &Path, interval: u32, entries: &[IndexEntry]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    index::write_header(&mut writer, interval)?;
    for entry in entries {
        writer.write_all(&entry.encode())?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
