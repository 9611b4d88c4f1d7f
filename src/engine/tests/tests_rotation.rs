use tempfile::tempdir;

use super::config_no_background_activity;
use crate::engine::{Engine, EngineConfig};

#[test]
fn fifty_one_distinct_sets_trigger_exactly_one_rotation() {
    let dir = tempdir().unwrap();
    let config = EngineConfig {
        memtable_capacity: 50,
        ..config_no_background_activity()
    };
    let engine = Engine::open(dir.path(), config).unwrap();

    for i in 0..=50 {
        engine.set(&format!("k{i}"), b"1".to_vec()).unwrap();
    }

    let result = engine.get("k0").unwrap().unwrap();
    assert!(!result.deleted);
    assert_eq!(result.value, b"1");

    engine.shutdown().unwrap();
}

#[test]
fn rotation_creates_a_new_wal_file() {
    let dir = tempdir().unwrap();
    let config = EngineConfig {
        memtable_capacity: 50,
        ..config_no_background_activity()
    };
    let engine = Engine::open(dir.path(), config).unwrap();

    for i in 0..=50 {
        engine.set(&format!("k{i}"), b"1".to_vec()).unwrap();
    }

    let wal_dir = dir.path().join("wal");
    assert!(wal_dir.join("1.wal.log").exists());
    assert!(wal_dir.join("2.wal.log").exists());

    engine.shutdown().unwrap();
}
