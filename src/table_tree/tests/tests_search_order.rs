use tempfile::tempdir;

use super::build_immutable;
use crate::record::SearchOutcome;
use crate::table_tree::TableTree;

#[test]
fn newer_level_zero_table_shadows_an_older_one() {
    let dir = tempdir().unwrap();
    let mut tree = TableTree::new(dir.path().to_path_buf(), 10);

    tree.insert(&build_immutable(&[("k", b"old", false)])).unwrap();
    tree.insert(&build_immutable(&[("k", b"new", false)])).unwrap();

    match tree.search("k").unwrap() {
        SearchOutcome::Success(record) => assert_eq!(record.value, b"new"),
        other => panic!("expected Success, got {other:?}"),
    }
}

#[test]
fn missing_key_across_every_level_returns_none() {
    let dir = tempdir().unwrap();
    let mut tree = TableTree::new(dir.path().to_path_buf(), 10);
    tree.insert(&build_immutable(&[("a", b"1", false)])).unwrap();

    assert_eq!(tree.search("nowhere").unwrap(), SearchOutcome::None);
}

#[test]
fn tombstone_is_a_terminal_hit_not_a_miss() {
    let dir = tempdir().unwrap();
    let mut tree = TableTree::new(dir.path().to_path_buf(), 10);
    tree.insert(&build_immutable(&[("k", b"", true)])).unwrap();

    assert_eq!(tree.search("k").unwrap(), SearchOutcome::Deleted);
}
