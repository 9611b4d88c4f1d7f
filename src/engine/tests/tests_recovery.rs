use tempfile::tempdir;

use super::config_no_background_activity;
use crate::engine::Engine;

#[test]
fn reopening_after_a_clean_shutdown_preserves_every_outcome() {
    let dir = tempdir().unwrap();

    {
        let engine = Engine::open(dir.path(), config_no_background_activity()).unwrap();
        engine.set("1", b"1".to_vec()).unwrap();
        engine.set("2", b"1".to_vec()).unwrap();
        engine.delete("2").unwrap();
        engine.shutdown().unwrap();
    }

    let engine = Engine::open(dir.path(), config_no_background_activity()).unwrap();
    let one = engine.get("1").unwrap().unwrap();
    assert!(!one.deleted);
    assert_eq!(one.value, b"1");

    let two = engine.get("2").unwrap().unwrap();
    assert!(two.deleted);

    engine.shutdown().unwrap();
}

#[test]
fn reopening_without_shutdown_still_replays_every_wal_write() {
    let dir = tempdir().unwrap();

    {
        // Dropped without calling shutdown() — simulates a crash after
        // every write was WAL-appended but before any graceful close.
        let engine = Engine::open(dir.path(), config_no_background_activity()).unwrap();
        engine.set("1", b"1".to_vec()).unwrap();
        engine.set("2", b"1".to_vec()).unwrap();
        engine.delete("2").unwrap();
    }

    let engine = Engine::open(dir.path(), config_no_background_activity()).unwrap();
    let one = engine.get("1").unwrap().unwrap();
    assert_eq!(one.value, b"1");
    assert!(engine.get("2").unwrap().unwrap().deleted);

    engine.shutdown().unwrap();
}
