//! Integration tests for the public `levelkv::engine::Engine` API.
//!
//! These exercise the full stack (WAL → memtable → table tree → SSTable)
//! through the public surface only. No internal modules are referenced.

use std::thread::sleep;
use std::time::Duration;

use levelkv::engine::{Engine, EngineConfig};
use tempfile::TempDir;

fn fast_tick_config(memtable_capacity: usize, level_threshold: usize) -> EngineConfig {
    EngineConfig {
        memtable_capacity,
        level_threshold,
        tick_interval: Duration::from_millis(30),
    }
}

fn no_background_config() -> EngineConfig {
    EngineConfig {
        tick_interval: Duration::from_secs(3600),
        ..EngineConfig::default()
    }
}

#[test]
fn put_get_and_delete() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(dir.path(), no_background_config()).unwrap();

    engine.set("1", b"1".to_vec()).unwrap();
    let one = engine.get("1").unwrap().unwrap();
    assert!(!one.deleted);
    assert_eq!(one.value, b"1");

    engine.set("2", b"1".to_vec()).unwrap();
    engine.delete("2").unwrap();
    assert!(engine.get("2").unwrap().unwrap().deleted);

    engine.shutdown().unwrap();
}

#[test]
fn crash_recovery_replays_every_write() {
    let dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(dir.path(), no_background_config()).unwrap();
        engine.set("1", b"1".to_vec()).unwrap();
        engine.set("2", b"1".to_vec()).unwrap();
        engine.delete("2").unwrap();
        // Dropped without shutdown() — simulates a crash.
    }

    let engine = Engine::open(dir.path(), no_background_config()).unwrap();
    assert_eq!(engine.get("1").unwrap().unwrap().value, b"1");
    assert!(engine.get("2").unwrap().unwrap().deleted);
    engine.shutdown().unwrap();
}

#[test]
fn fifty_one_writes_rotate_exactly_once() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig {
        memtable_capacity: 50,
        ..no_background_config()
    };
    let engine = Engine::open(dir.path(), config).unwrap();

    for i in 0..=50 {
        engine.set(&format!("k{i}"), b"1".to_vec()).unwrap();
    }

    assert!(dir.path().join("wal").join("1.wal.log").exists());
    assert!(dir.path().join("wal").join("2.wal.log").exists());
    assert_eq!(engine.get("k0").unwrap().unwrap().value, b"1");

    engine.shutdown().unwrap();
}

#[test]
fn background_tick_flushes_the_immutable_to_a_level_zero_sstable() {
    let dir = TempDir::new().unwrap();
    let config = fast_tick_config(50, 10);
    let engine = Engine::open(dir.path(), config).unwrap();

    for i in 0..=50 {
        engine.set(&format!("k{i}"), b"1".to_vec()).unwrap();
    }
    let wal_path = dir.path().join("wal").join("1.wal.log");
    assert!(wal_path.exists());

    sleep(Duration::from_millis(150));

    assert!(!wal_path.exists());
    assert!(dir.path().join("sst").join("0.0.db").exists());
    assert_eq!(engine.get("k0").unwrap().unwrap().value, b"1");

    engine.shutdown().unwrap();
}

#[test]
fn overflowing_level_zero_compacts_into_level_one() {
    let dir = TempDir::new().unwrap();
    let config = fast_tick_config(2, 10);
    let engine = Engine::open(dir.path(), config).unwrap();

    for tag in 0..11 {
        for i in 0..=2 {
            engine.set(&format!("t{tag}-{i}"), b"1".to_vec()).unwrap();
        }
        sleep(Duration::from_millis(80));
    }
    sleep(Duration::from_millis(80));

    let sst_dir = dir.path().join("sst");
    assert!(!sst_dir.join("0.0.db").exists());
    assert!(sst_dir.join("1.0.db").exists());
    assert_eq!(engine.get("t0-0").unwrap().unwrap().value, b"1");

    engine.shutdown().unwrap();
}
