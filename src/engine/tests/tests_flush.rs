use std::thread::sleep;
use std::time::Duration;

use tempfile::tempdir;

use super::config_with_fast_tick;
use crate::engine::Engine;

#[test]
fn a_tick_after_rotation_drains_the_immutable_to_a_level_zero_sstable() {
    let dir = tempdir().unwrap();
    let config = config_with_fast_tick(50, 10);
    let engine = Engine::open(dir.path(), config).unwrap();

    for i in 0..=50 {
        engine.set(&format!("k{i}"), b"1".to_vec()).unwrap();
    }

    let wal_path = dir.path().join("wal").join("1.wal.log");
    assert!(wal_path.exists());

    sleep(Duration::from_millis(150));

    assert!(!wal_path.exists());
    let sst_dir = dir.path().join("sst");
    assert!(sst_dir.join("0.0.db").exists());

    let result = engine.get("k0").unwrap().unwrap();
    assert!(!result.deleted);
    assert_eq!(result.value, b"1");

    engine.shutdown().unwrap();
}
