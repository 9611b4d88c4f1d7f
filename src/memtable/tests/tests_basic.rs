use std::path::PathBuf;

use crate::memtable::Memtable;
use crate::record::SearchOutcome;

fn table() -> Memtable {
    Memtable::new(PathBuf::from("1.wal.log"), 50)
}

#[test]
fn search_missing_key_is_none() {
    let mt = table();
    assert_eq!(mt.search("missing"), SearchOutcome::None);
}

#[test]
fn set_then_search_is_success() {
    let mt = table();
    mt.set("1", b"1".to_vec());
    match mt.search("1") {
        SearchOutcome::Success(record) => {
            assert_eq!(record.key, "1");
            assert_eq!(record.value, b"1");
            assert!(!record.deleted);
        }
        other => panic!("expected Success, got {other:?}"),
    }
}

#[test]
fn set_overwrites_existing_key() {
    let mt = table();
    mt.set("1", b"a".to_vec());
    let (old, had_old) = mt.set("1", b"b".to_vec());
    assert!(had_old);
    assert_eq!(old.unwrap().value, b"a");
    match mt.search("1") {
        SearchOutcome::Success(record) => assert_eq!(record.value, b"b"),
        other => panic!("expected Success, got {other:?}"),
    }
    assert_eq!(mt.len(), 1);
}

#[test]
fn delete_missing_key_inserts_tombstone() {
    let mt = table();
    let (old, had_old) = mt.delete("gone");
    assert!(old.is_none());
    assert!(!had_old);
    assert_eq!(mt.search("gone"), SearchOutcome::Deleted);
    assert_eq!(mt.len(), 1);
}

#[test]
fn delete_live_key_reports_pre_deletion_record() {
    let mt = table();
    mt.set("2", b"1".to_vec());
    let (old, had_old) = mt.delete("2");
    assert!(had_old);
    let old = old.unwrap();
    assert_eq!(old.key, "2");
    assert_eq!(old.value, b"1");
    assert!(!old.deleted);
    assert_eq!(mt.search("2"), SearchOutcome::Deleted);
}

#[test]
fn set_resurrects_tombstoned_key_reporting_had_old_false() {
    let mt = table();
    mt.delete("3");
    let (_old, had_old) = mt.set("3", b"again".to_vec());
    assert!(!had_old);
    match mt.search("3") {
        SearchOutcome::Success(record) => assert_eq!(record.value, b"again"),
        other => panic!("expected Success, got {other:?}"),
    }
}

#[test]
fn values_are_ascending_by_key() {
    let mt = table();
    mt.set("c", b"3".to_vec());
    mt.set("a", b"1".to_vec());
    mt.set("b", b"2".to_vec());
    let keys: Vec<_> = mt.values().into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn values_include_tombstones() {
    let mt = table();
    mt.set("a", b"1".to_vec());
    mt.delete("b");
    let values = mt.values();
    assert_eq!(values.len(), 2);
    assert!(values.iter().any(|r| r.key == "b" && r.deleted));
}

#[test]
fn name_returns_wal_path() {
    let mt = Memtable::new(PathBuf::from("7.wal.log"), 50);
    assert_eq!(mt.name(), PathBuf::from("7.wal.log"));
}
