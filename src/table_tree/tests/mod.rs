mod tests_search_order;

use std::path::PathBuf;

use crate::memtable::{ImmutableMemtable, Memtable};

pub(super) fn build_immutable(entries: &[(&str, &[u8], bool)]) -> ImmutableMemtable {
    let memtable = Memtable::new(PathBuf::from("unused.wal.log"), 1000);
    for (key, value, deleted) in entries {
        if *deleted {
            memtable.delete(key);
        } else {
            memtable.set(key, value.to_vec());
        }
    }
    memtable.freeze()
}
