use std::fs::OpenOptions;
use std::io::Write;

use tempfile::tempdir;

use crate::record::Record;
use crate::wal::Wal;

#[test]
fn partial_trailing_frame_is_truncated_not_fatal() {
    let dir = tempdir().unwrap();
    let wal = Wal::create(dir.path(), 1).unwrap();
    wal.write(&Record::live("a", b"1".to_vec())).unwrap();
    let good_len = std::fs::metadata(wal.path()).unwrap().len();
    drop(wal);

    {
        let mut file = OpenOptions::new().append(true).open(dir.path().join("1.wal.log")).unwrap();
        file.write_all(&[0x10, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        file.write_all(b"short").unwrap();
    }

    let wal = Wal::create(dir.path(), 1).unwrap();
    let records = wal.replay().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "a");

    let truncated_len = std::fs::metadata(wal.path()).unwrap().len();
    assert_eq!(truncated_len, good_len);
}

#[test]
fn partial_length_prefix_is_truncated() {
    let dir = tempdir().unwrap();
    let wal = Wal::create(dir.path(), 1).unwrap();
    wal.write(&Record::live("a", b"1".to_vec())).unwrap();
    let good_len = std::fs::metadata(wal.path()).unwrap().len();
    drop(wal);

    {
        let mut file = OpenOptions::new().append(true).open(dir.path().join("1.wal.log")).unwrap();
        file.write_all(&[0x01, 0x00, 0x00]).unwrap();
    }

    let wal = Wal::create(dir.path(), 1).unwrap();
    let records = wal.replay().unwrap();
    assert_eq!(records.len(), 1);

    let truncated_len = std::fs::metadata(wal.path()).unwrap().len();
    assert_eq!(truncated_len, good_len);
}

#[test]
fn fully_present_but_malformed_frame_is_fatal() {
    let dir = tempdir().unwrap();
    let wal = Wal::create(dir.path(), 1).unwrap();
    drop(wal);

    {
        let mut file = OpenOptions::new().append(true).open(dir.path().join("1.wal.log")).unwrap();
        // declared length 4, body is present but not a valid encoded Record.
        file.write_all(&4u64.to_le_bytes()).unwrap();
        file.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
    }

    let wal = Wal::create(dir.path(), 1).unwrap();
    assert!(wal.replay().is_err());
}
