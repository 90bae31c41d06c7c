// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use super::*;

#[test]
fn write_then_read_roundtrips_and_replaces() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("store.json");

    write_json(&path, &BTreeMap::from([("a", 1)]))?;
    write_json(&path, &BTreeMap::from([("b", 2)]))?;

    let read: BTreeMap<String, i32> = read_json(&path)?;
    assert_eq!(read, BTreeMap::from([("b".to_owned(), 2)]));
    Ok(())
}

#[test]
fn no_staging_files_are_left_behind() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("store.json");
    for n in 0..5 {
        write_json(&path, &n)?;
    }

    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names, vec!["store.json".to_owned()]);
    Ok(())
}

#[test]
fn corrupt_file_names_the_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{not json")?;

    let err = read_json::<PersistedSessions>(&path).err().map(|e| e.to_string());
    assert!(err.is_some_and(|msg| msg.contains("store.json")));
    Ok(())
}
