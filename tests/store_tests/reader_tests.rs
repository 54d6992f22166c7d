//! Tests for RecordReader

use std::fs;

use vtable::store::{index_path, RecordReader, RecordWriter, StoreSnapshot};
use vtable::{KeysetReader, SyncStrategy, VtError};

use super::{corrupt_byte, fill_store, frame_offset, setup_temp_store, value_for};

#[test]
fn test_open_missing_store_is_unavailable() {
    let (_temp, dir) = setup_temp_store();

    let result = RecordReader::open(&dir);

    assert!(matches!(result, Err(VtError::StoreUnavailable(_))));
}

#[test]
fn test_empty_store_snapshot() {
    let (_temp, dir) = setup_temp_store();
    RecordWriter::open(&dir, 16, SyncStrategy::EveryBatch)
        .unwrap()
        .close()
        .unwrap();

    let reader = RecordReader::open(&dir).unwrap();

    assert_eq!(reader.count(), 0);
    assert_eq!(reader.min_key(), None);
    assert_eq!(reader.snapshot(), StoreSnapshot::new(0, 1));
}

#[test]
fn test_count_includes_unindexed_tail() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 1000, 128);

    let reader = RecordReader::open(&dir).unwrap();

    assert_eq!(reader.count(), 1000);
    assert_eq!(reader.min_key(), Some(1));
    assert_eq!(reader.index_len(), 8);
}

#[test]
fn test_scan_from_first_key() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 100, 16);
    let mut reader = RecordReader::open(&dir).unwrap();

    let rows = reader.scan_from(1, 10).unwrap();

    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].key, 1);
    assert_eq!(rows[9].key, 10);
    assert_eq!(rows[3].value, value_for(4));
}

#[test]
fn test_scan_from_between_index_entries() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 100, 16);
    let mut reader = RecordReader::open(&dir).unwrap();

    // 37 lies between indexed keys 33 and 49
    let rows = reader.scan_from(37, 20).unwrap();

    let keys: Vec<u64> = rows.iter().map(|r| r.key).collect();
    assert_eq!(keys, (37..57).collect::<Vec<_>>());
}

#[test]
fn test_scan_stops_at_end_of_store() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 100, 16);
    let mut reader = RecordReader::open(&dir).unwrap();

    let rows = reader.scan_from(95, 50).unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows.last().unwrap().key, 100);

    assert!(reader.scan_from(101, 50).unwrap().is_empty());
}

#[test]
fn test_scan_with_zero_limit() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 10, 16);
    let mut reader = RecordReader::open(&dir).unwrap();

    assert!(reader.scan_from(1, 0).unwrap().is_empty());
}

#[test]
fn test_read_range_returns_every_value_in_order() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 1000, 16);
    let mut reader = RecordReader::open(&dir).unwrap();

    for start in (1..=1000).step_by(64) {
        let rows = reader.read_range(start, 64).unwrap();
        for (i, record) in rows.iter().enumerate() {
            let key = start + i as u64;
            assert_eq!(record.key, key);
            assert_eq!(record.value, value_for(key));
        }
    }
}

#[test]
fn test_reader_sees_batches_written_after_open_of_writer() {
    let (_temp, dir) = setup_temp_store();
    let mut writer = RecordWriter::open(&dir, 4, SyncStrategy::OnClose).unwrap();
    writer.append_batch((1..=10).map(value_for)).unwrap();

    // append_batch flushes, so a reader opened now sees all ten records
    let mut reader = RecordReader::open(&dir).unwrap();

    assert_eq!(reader.count(), 10);
    assert_eq!(reader.scan_from(10, 5).unwrap().len(), 1);
}

#[test]
fn test_reader_without_index_file() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 300, 16);
    fs::remove_file(index_path(&dir)).unwrap();

    let mut reader = RecordReader::open(&dir).unwrap();

    assert_eq!(reader.count(), 300);
    let rows = reader.scan_from(250, 3).unwrap();
    assert_eq!(rows.iter().map(|r| r.key).collect::<Vec<_>>(), vec![250, 251, 252]);
}

#[test]
fn test_corrupt_frame_reported_on_read() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 200, 128);
    // A payload byte of the record with key 6; open only scans from key 129
    corrupt_byte(&dir, frame_offset(5) + 12);

    let mut reader = RecordReader::open(&dir).unwrap();
    assert_eq!(reader.count(), 200);

    let result = reader.scan_from(1, 10);
    assert!(matches!(result, Err(VtError::Corruption(_))));

    // Windows that do not cross the bad frame still read
    let rows = reader.scan_from(129, 10).unwrap();
    assert_eq!(rows[0].key, 129);
}

#[test]
fn test_corrupt_tail_fails_open() {
    let (_temp, dir) = setup_temp_store();
    fill_store(&dir, 20, 128);
    corrupt_byte(&dir, frame_offset(15) + 4);

    let result = RecordReader::open(&dir);

    assert!(matches!(result, Err(VtError::Corruption(_))));
}

#[test]
fn test_snapshot_key_for_position() {
    let snapshot = StoreSnapshot::new(3_000_000, 1);

    assert_eq!(snapshot.key_for(0), 1);
    assert_eq!(snapshot.key_for(2_500_000), 2_500_001);
    assert_eq!(snapshot.key_for(2_999_999), 3_000_000);
}
