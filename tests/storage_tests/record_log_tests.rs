//! Tests for RecordLog
//!
//! These tests verify:
//! - Append returns the end offset of the written bytes
//! - Reads observe buffered appends
//! - Short reads are reported as size mismatches
//! - Existing bytes survive a reopen

use std::fs::{self, OpenOptions};

use driftkv::config::FlushStrategy;
use driftkv::storage::RecordLog;
use driftkv::DriftError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log(strategy: FlushStrategy) -> (TempDir, RecordLog) {
    let temp_dir = TempDir::new().unwrap();
    let log = RecordLog::open(&temp_dir.path().join("records.log"), strategy).unwrap();
    (temp_dir, log)
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_returns_end_offset() {
    let (_temp, log) = setup_temp_log(FlushStrategy::OnRead);

    let end = log.append("hello", b"world").unwrap();
    assert_eq!(end, 10);

    let end = log.append("k", b"vv").unwrap();
    assert_eq!(end, 13);
    assert_eq!(log.len(), 13);
}

#[test]
fn test_value_sits_before_end_offset() {
    let (_temp, log) = setup_temp_log(FlushStrategy::OnRead);

    log.append("first", b"one").unwrap();
    let end = log.append("second", b"two").unwrap();

    let value = log.read(end - 3, 3).unwrap();
    assert_eq!(value, b"two");
}

#[test]
fn test_file_holds_raw_key_and_value_bytes() {
    let (temp, log) = setup_temp_log(FlushStrategy::EveryAppend);

    log.append("ab", b"cd").unwrap();
    log.append("e", b"").unwrap();

    let raw = fs::read(temp.path().join("records.log")).unwrap();
    assert_eq!(raw, b"abcde");
}

#[test]
fn test_empty_value_append() {
    let (_temp, log) = setup_temp_log(FlushStrategy::OnRead);

    let end = log.append("empty", b"").unwrap();
    assert_eq!(end, 5);
    assert_eq!(log.read(end, 0).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_every_n_appends_flushes_on_count() {
    let (temp, log) = setup_temp_log(FlushStrategy::EveryNAppends { count: 2 });
    let path = temp.path().join("records.log");

    log.append("a", b"1").unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);

    log.append("b", b"2").unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 4);
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_flushes_buffered_appends() {
    let (temp, log) = setup_temp_log(FlushStrategy::OnRead);

    let end = log.append("key", b"buffered").unwrap();
    assert_eq!(fs::metadata(temp.path().join("records.log")).unwrap().len(), 0);

    assert_eq!(log.read(end - 8, 8).unwrap(), b"buffered");
}

#[test]
fn test_read_past_end_is_size_mismatch() {
    let (_temp, log) = setup_temp_log(FlushStrategy::OnRead);

    log.append("key", b"value").unwrap();

    match log.read(5, 10) {
        Err(DriftError::SizeMismatch { expected, actual }) => {
            assert_eq!(expected, 10);
            assert_eq!(actual, 3);
        }
        other => panic!("Expected SizeMismatch, got {:?}", other),
    }
}

#[test]
fn test_read_after_truncation_is_size_mismatch() {
    let (temp, log) = setup_temp_log(FlushStrategy::EveryAppend);
    let path = temp.path().join("records.log");

    let end = log.append("key", b"0123456789").unwrap();

    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(end - 4).unwrap();

    let err = log.read(end - 10, 10).unwrap_err();
    assert!(matches!(err, DriftError::SizeMismatch { expected: 10, actual: 6 }));
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_reopen_keeps_bytes_and_cursor() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("records.log");

    {
        let log = RecordLog::open(&path, FlushStrategy::OnRead).unwrap();
        log.append("persist", b"me").unwrap();
        log.sync().unwrap();
    }

    let log = RecordLog::open(&path, FlushStrategy::OnRead).unwrap();
    assert_eq!(log.base_offset(), 9);
    assert_eq!(log.read(7, 2).unwrap(), b"me");

    let end = log.append("next", b"x").unwrap();
    assert_eq!(end, 14);
}
