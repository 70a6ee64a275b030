use std::fs;

use tempfile::tempdir;
use todus_fs::{Error, split_file};

#[test]
fn test_split_reassembles_to_source() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("song.mp3");
    let content: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
    fs::write(&source, &content).unwrap();

    let out = dir.path().join("parts");
    fs::create_dir(&out).unwrap();
    let parts = split_file(&source, 1000, &out).unwrap();

    let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["song.mp3.001", "song.mp3.002", "song.mp3.003"]);
    assert_eq!(parts.iter().map(|p| p.size).collect::<Vec<_>>(), [1000, 1000, 500]);

    let mut joined = Vec::new();
    for part in &parts {
        joined.extend(fs::read(&part.path).unwrap());
    }
    assert_eq!(joined, content);
}

#[test]
fn test_split_exact_multiple() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("x.bin");
    fs::write(&source, [7u8; 20]).unwrap();
    let parts = split_file(&source, 10, dir.path()).unwrap();
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|p| p.size == 10));
}

#[test]
fn test_split_empty_file_yields_one_part() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("empty");
    fs::write(&source, b"").unwrap();
    let parts = split_file(&source, 10, dir.path()).unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].size, 0);
}

#[test]
fn test_split_rejects_zero_part_size() {
    let dir = tempdir().unwrap();
    assert!(matches!(split_file(dir.path().join("f"), 0, dir.path()), Err(Error::InvalidPartSize)));
}

#[test]
fn test_split_missing_source() {
    let dir = tempdir().unwrap();
    assert!(matches!(split_file(dir.path().join("missing"), 10, dir.path()), Err(Error::NotFound(_))));
}
