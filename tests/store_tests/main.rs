//! Tests for the record store
//!
//! These tests verify:
//! - Key assignment and batching in RecordWriter
//! - Keyset scans through the sparse index in RecordReader
//! - Recovery of torn and corrupt stores
//! - Idempotent seeding with ensure_store

mod reader_tests;
mod recovery_tests;

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vtable::store::{data_path, RecordWriter};
use vtable::SyncStrategy;

// =============================================================================
// Helper Functions
// =============================================================================

/// Header bytes before the first frame in records.dat
pub const DATA_HEADER: u64 = 6;

/// On-disk size of one frame written by `fill_store`:
/// len (4) + crc (4) + key (8) + string len (8) + 10 value bytes
pub const FRAME_LEN: u64 = 34;

pub fn setup_temp_store() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store");
    (temp_dir, path)
}

/// Fixed-width value stored under `key`
pub fn value_for(key: u64) -> String {
    format!("v{:09}", key)
}

/// Append `count` records (keys continue from the store's next key)
pub fn fill_store(dir: &Path, count: u64, interval: u32) {
    let mut writer = RecordWriter::open(dir, interval, SyncStrategy::OnClose).unwrap();
    let first = writer.next_key();
    let values: Vec<String> = (first..first + count).map(value_for).collect();
    writer.append_batch(values).unwrap();
    writer.close().unwrap();
}

/// Offset of the frame holding the record at ordinal `ordinal`
pub fn frame_offset(ordinal: u64) -> u64 {
    DATA_HEADER + ordinal * FRAME_LEN
}

/// Flip one byte of records.dat
pub fn corrupt_byte(dir: &Path, offset: u64) {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(data_path(dir))
        .unwrap();
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::Start(offset)).unwrap();
    std::io::Read::read_exact(&mut file, &mut byte).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[byte[0] ^ 0xFF]).unwrap();
    file.sync_all().unwrap();
}

/// Cut `bytes` off the end of records.dat
pub fn truncate_data(dir: &Path, bytes: u64) {
    let file = OpenOptions::new().write(true).open(data_path(dir)).unwrap();
    let len = file.metadata().unwrap().len();
    file.set_len(len - bytes).unwrap();
}

/// Append raw bytes to records.dat
pub fn append_garbage(dir: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(data_path(dir)).unwrap();
    file.write_all(bytes).unwrap();
}
