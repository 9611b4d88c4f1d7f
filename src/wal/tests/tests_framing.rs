use tempfile::tempdir;

use crate::record::Record;
use crate::wal::Wal;

#[test]
fn write_then_replay_roundtrips() {
    let dir = tempdir().unwrap();
    let wal = Wal::create(dir.path(), 1).unwrap();

    wal.write(&Record::live("a", b"1".to_vec())).unwrap();
    wal.write(&Record::live("b", b"2".to_vec())).unwrap();
    wal.write(&Record::tombstone("a")).unwrap();

    let records = wal.replay().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].key, "a");
    assert!(!records[0].deleted);
    assert_eq!(records[2].key, "a");
    assert!(records[2].deleted);
}

#[test]
fn file_name_matches_index_dot_wal_dot_log() {
    let dir = tempdir().unwrap();
    let wal = Wal::create(dir.path(), 7).unwrap();
    assert_eq!(wal.path().file_name().unwrap().to_str().unwrap(), "7.wal.log");
    assert_eq!(wal.index(), 7);
}

#[test]
fn empty_wal_replays_to_nothing() {
    let dir = tempdir().unwrap();
    let wal = Wal::create(dir.path(), 1).unwrap();
    assert!(wal.replay().unwrap().is_empty());
}
