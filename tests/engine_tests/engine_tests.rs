//! Tests for Engine
//!
//! These tests verify:
//! - Set/get round trips, overwrites and missing keys
//! - Listing every stored key
//! - Index entries always point at the value bytes
//! - Concurrent sets land on disjoint log ranges
//! - Reopen, refusal of truncated stores and teardown

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::sync::Arc;
use std::thread;

use driftkv::config::{Config, FlushStrategy};
use driftkv::engine::Engine;
use driftkv::{DriftError, Record};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path().join("store"))
        .flush_strategy(FlushStrategy::EveryAppend)
        .build()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let config = Config::builder().data_dir(&data_dir).build();
    let _engine = Engine::open(config).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("records.log").exists());
}

#[test]
fn test_engine_set_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(Record::new("hello", "world")).unwrap();

    assert_eq!(engine.get("hello").unwrap(), b"world");
}

#[test]
fn test_engine_empty_value() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("empty", b"").unwrap();

    assert_eq!(engine.get("empty").unwrap(), Vec::<u8>::new());
    assert_eq!(engine.key_info("empty").unwrap().size, 0);
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();
    engine.put("other", b"x").unwrap();

    match engine.get("nonexistent") {
        Err(DriftError::KeyNotFound(key)) => assert_eq!(key, "nonexistent"),
        other => panic!("Expected KeyNotFound, got {:?}", other),
    }
}

#[test]
fn test_engine_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("key", b"value1").unwrap();
    engine.put("key", b"a much longer second value").unwrap();

    assert_eq!(engine.get("key").unwrap(), b"a much longer second value");
    assert_eq!(engine.list_keys(), vec!["key".to_string()]);
}

#[test]
fn test_engine_list_keys() {
    let (_temp, engine) = setup_temp_engine();

    assert!(engine.list_keys().is_empty());

    engine.put("hello", b"world").unwrap();
    engine.put("strange", b"fruit").unwrap();

    let keys: HashSet<String> = engine.list_keys().into_iter().collect();
    let expected: HashSet<String> = ["hello", "strange"].iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_index_entry_points_at_value_bytes() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("alpha", b"1111").unwrap();
    engine.put("beta", b"22").unwrap();

    let info = engine.key_info("beta").unwrap();
    assert_eq!(info.size, 2);
    // alpha(5) + 1111(4) + beta(4)
    assert_eq!(info.offset, 13);
    assert_eq!(info.end(), engine.log_len());
    assert_eq!(engine.read_range(info).unwrap(), b"22");
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_sets_use_disjoint_ranges() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(test_config(&temp_dir)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    let key = format!("t{}_k{}", t, i);
                    let value = format!("value-{}-{}", t, i);
                    engine.put(&key, value.as_bytes()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let keys = engine.list_keys();
    assert_eq!(keys.len(), 200);

    let infos: Vec<_> = keys.iter().map(|k| engine.key_info(k).unwrap()).collect();
    for (i, a) in infos.iter().enumerate() {
        for b in &infos[i + 1..] {
            assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
        }
    }

    for t in 0..8 {
        for i in 0..25 {
            let value = engine.get(&format!("t{}_k{}", t, i)).unwrap();
            assert_eq!(value, format!("value-{}-{}", t, i).into_bytes());
        }
    }
}

#[test]
fn test_concurrent_readers_and_writer() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);
    engine.put("stable", b"constant").unwrap();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..50 {
                engine.put(&format!("w{}", i), b"payload").unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..50 {
                    assert_eq!(engine.get("stable").unwrap(), b"constant");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(engine.key_count(), 51);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_reopen_keeps_data() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        engine.put("hello", b"world").unwrap();
        engine.put("strange", b"fruit").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(engine.get("hello").unwrap(), b"world");
    assert_eq!(engine.get("strange").unwrap(), b"fruit");
    assert!(engine.check_consistency().is_empty());

    // New appends land after the existing bytes
    engine.put("third", b"3").unwrap();
    assert_eq!(engine.get("hello").unwrap(), b"world");
    assert_eq!(engine.get("third").unwrap(), b"3");
}

#[test]
fn test_truncated_log_refuses_open() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);

    {
        let engine = Engine::open(config.clone()).unwrap();
        engine.put("keep", b"short").unwrap();
        engine.put("lost", b"0123456789").unwrap();
        engine.close().unwrap();
    }

    // Cut into the middle of "lost"'s key bytes
    let file = OpenOptions::new().write(true).open(config.log_path()).unwrap();
    file.set_len(12).unwrap();
    drop(file);

    match Engine::open(config.clone()) {
        Err(DriftError::DanglingIndex { keys, log_len }) => {
            assert_eq!(keys, vec!["lost".to_string()]);
            assert_eq!(log_len, 12);
        }
        Err(e) => panic!("Expected DanglingIndex, got {}", e),
        Ok(_) => panic!("Expected DanglingIndex, got an engine"),
    }

    // Refusing to open means nothing was appended over the dangling range
    assert_eq!(fs::metadata(config.log_path()).unwrap().len(), 12);
}

#[test]
fn test_dangling_key_never_aliases_new_writes() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);

    {
        let engine = Engine::open(config.clone()).unwrap();
        engine.put("keep", b"short").unwrap();
        engine.put("lost", b"0123456789").unwrap();
        engine.close().unwrap();
    }

    let file = OpenOptions::new().write(true).open(config.log_path()).unwrap();
    file.set_len(9).unwrap();
    drop(file);

    assert!(Engine::open(config.clone()).is_err());

    // Every later attempt is refused too; "lost" can never resolve to "newkey"'s bytes
    match Engine::open(config) {
        Err(DriftError::DanglingIndex { keys, .. }) => assert_eq!(keys, vec!["lost".to_string()]),
        Err(e) => panic!("Expected DanglingIndex, got {}", e),
        Ok(engine) => {
            engine.put("newkey", b"ABCDEFGHIJ").unwrap();
            panic!("Opened a dangling store; lost = {:?}", engine.get("lost"));
        }
    }
}

#[test]
fn test_engine_remove_deletes_store() {
    let (temp, engine) = setup_temp_engine();
    engine.put("k", b"v").unwrap();

    let data_dir = temp.path().join("store");
    assert!(data_dir.exists());

    engine.remove().unwrap();
    assert!(!data_dir.exists());
}
