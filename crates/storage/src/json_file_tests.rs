use super::*;
use crate::io::FsStoreIo;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sample {
    name: String,
    count: u32,
}

#[test]
fn write_then_read_roundtrips() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("sample.json");
    let io = FsStoreIo;
    let value = Sample {
        name: "a".into(),
        count: 3,
    };
    write_json(&io, &path, &value).expect("write");
    let loaded: Option<Sample> = read_json(&io, &path).expect("read");
    assert_eq!(loaded, Some(value));
}

#[test]
fn missing_file_reads_as_none() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("missing.json");
    let loaded: Option<Sample> = read_json(&FsStoreIo, &path).expect("read");
    assert_eq!(loaded, None);
}

#[test]
fn corrupt_file_is_backed_up_and_reset() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("sample.json");
    let io = FsStoreIo;
    io.write_atomic(&path, b"not json").expect("write garbage");

    let loaded: Option<Sample> = read_json(&io, &path).expect("read");
    assert_eq!(loaded, None);

    let backup = path.with_extension("corrupt");
    assert!(backup.exists());
    let reset = std::fs::read_to_string(&path).expect("read reset");
    assert_eq!(reset, "{}");
}
