//! Tests for StoreRecovery
//!
//! These tests verify:
//! - A torn trailing frame is cut back to the last whole record
//! - A corrupt trailing frame is cut off before appending
//! - Missing or stale index entries are rebuilt from the data

use std::fs::{self, OpenOptions};

use vtable::store::{data_path, index_path, RecordReader, RecordWriter, StoreRecovery};
use vtable::SyncStrategy;

use super::{
    append_garbage, corrupt_byte, fill_store, frame_offset, setup_temp_store, truncate_data,
    value_for, FRAME_LEN,
};

// =============================================================================
// Torn Writes
// =============================================================================

#[test]
fn test_partial_frame_header_truncated() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 10, 4);
    append_garbage(&dir, &[26, 0, 0, 0, 0xAB]);

    let result = StoreRecovery::recover(&dir, 4).unwrap();

    assert_eq!(result.record_count, 10);
    assert_eq!(result.bytes_truncated, 5);
    assert_eq!(result.last_key, Some(10));
    assert_eq!(fs::metadata(data_path(&dir)).unwrap().len(), frame_offset(10));
}

#[test]
fn test_frame_torn_mid_payload() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 10, 4);
    truncate_data(&dir, 3);

    let mut writer = RecordWriter::open(&dir, 4, SyncStrategy::EveryBatch).unwrap();

    assert_eq!(writer.count(), 9);
    assert_eq!(writer.recovery().bytes_truncated, FRAME_LEN - 3);
    assert_eq!(writer.next_key(), 10);

    let keys = writer.append_batch(vec![value_for(10)]).unwrap();
    assert_eq!(keys, Some(10..=10));
    writer.close().unwrap();

    let mut reader = RecordReader::open(&dir).unwrap();
    let rows = reader.scan_from(8, 10).unwrap();
    assert_eq!(rows.iter().map(|r| r.key).collect::<Vec<_>>(), vec![8, 9, 10]);
    assert_eq!(rows[2].value, value_for(10));
}

#[test]
fn test_reader_treats_torn_tail_as_end() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 10, 4);
    truncate_data(&dir, 3);

    let mut reader = RecordReader::open(&dir).unwrap();

    assert_eq!(reader.count(), 9);
    assert_eq!(reader.scan_from(1, 100).unwrap().len(), 9);
}

#[test]
fn test_corrupt_last_frame_truncated() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 10, 4);
    corrupt_byte(&dir, frame_offset(9) + 20);

    let result = StoreRecovery::recover(&dir, 4).unwrap();

    assert_eq!(result.record_count, 9);
    assert_eq!(result.bytes_truncated, FRAME_LEN);
    assert_eq!(result.last_key, Some(9));
}

#[test]
fn test_torn_header_rewritten() {
    let (_temp, dir) = setup_temp_store();
    fs::create_dir_all(&dir).unwrap();
    fs::write(data_path(&dir), b"VT").unwrap();

    let result = StoreRecovery::recover(&dir, 4).unwrap();

    assert_eq!(result.record_count, 0);
    assert_eq!(fs::metadata(data_path(&dir)).unwrap().len(), 6);
}

// =============================================================================
// Index Repair
// =============================================================================

#[test]
fn test_missing_index_entries_rebuilt() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 300, 128);

    // Keep only the index header
    let index = OpenOptions::new().write(true).open(index_path(&dir)).unwrap();
    index.set_len(10).unwrap();

    let result = StoreRecovery::recover(&dir, 128).unwrap();

    assert_eq!(result.record_count, 300);
    assert_eq!(result.index_entries_rebuilt, 3);
    assert_eq!(
        result.index_entries,
        vec![
            (1, frame_offset(0)),
            (129, frame_offset(128)),
            (257, frame_offset(256)),
        ]
    );

    // The rebuilt index is persisted
    let again = StoreRecovery::recover(&dir, 128).unwrap();
    assert_eq!(again.index_entries_rebuilt, 0);
    assert_eq!(again.index_entries.len(), 3);
}

#[test]
fn test_index_entries_past_data_dropped() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 300, 128);
    // Leaves records 0..200; the entry for ordinal 256 now points past the end
    truncate_data(&dir, 100 * FRAME_LEN);

    let result = StoreRecovery::recover(&dir, 128).unwrap();

    assert_eq!(result.record_count, 200);
    assert_eq!(result.bytes_truncated, 0);
    let keys: Vec<u64> = result.index_entries.iter().map(|e| e.0).collect();
    assert_eq!(keys, vec![1, 129]);

    let mut writer = RecordWriter::open(&dir, 128, SyncStrategy::EveryBatch).unwrap();
    assert_eq!(writer.next_key(), 201);
    writer.append_batch((201..=300).map(value_for)).unwrap();
    writer.close().unwrap();

    let mut reader = RecordReader::open(&dir).unwrap();
    assert_eq!(reader.count(), 300);
    assert_eq!(reader.scan_from(257, 1).unwrap()[0].value, value_for(257));
}

#[test]
fn test_recovery_is_idempotent_on_clean_store() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 50, 8);
    let before = fs::metadata(data_path(&dir)).unwrap().len();

    let first = StoreRecovery::recover(&dir, 8).unwrap();
    let second = StoreRecovery::recover(&dir, 8).unwrap();

    assert_eq!(first.record_count, 50);
    assert_eq!(first.bytes_truncated, 0);
    assert_eq!(first.index_entries, second.index_entries);
    assert_eq!(fs::metadata(data_path(&dir)).unwrap().len(), before);
}
