//! Persistence
//!
//! Whole-store JSON snapshot: a single document with `store` (key → value)
//! and `ttl` (key → deadline-milliseconds) objects. Saves go through a
//! temporary file and a rename so a crash mid-write never leaves a
//! half-written database behind. Cold path: startup, shutdown, batched
//! saves, and write-through mode.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NukeError, Result};

/// On-disk snapshot document
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub store: HashMap<String, String>,

    #[serde(default)]
    pub ttl: HashMap<String, i64>,
}

/// Borrowing mirror of [`Snapshot`] so saving never clones the maps
#[derive(Serialize)]
struct SnapshotRef<'a> {
    store: &'a HashMap<String, String>,
    ttl: &'a HashMap<String, i64>,
}

/// Write a snapshot to `path` (truncate-and-rename).
pub fn save(path: &Path, store: &HashMap<String, String>, ttl: &HashMap<String, i64>) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &SnapshotRef { store, ttl })
        .map_err(|e| NukeError::Persistence(format!("failed to serialize snapshot: {e}")))?;
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a snapshot from `path`. A missing or empty file yields an empty
/// snapshot; a corrupt file is an error the caller logs before starting
/// empty.
pub fn load(path: &Path) -> Result<Snapshot> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
        Err(e) => return Err(e.into()),
    };

    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Snapshot::default());
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| NukeError::Persistence(format!("could not parse database file: {e}")))
}

/// On-disk size of the snapshot, if it exists (STATS reporting)
pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|m| m.len())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = load(&dir.path().join("absent.db")).unwrap();
        assert!(snapshot.store.is_empty());
        assert!(snapshot.ttl.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nukekv.db");

        let mut store = HashMap::new();
        store.insert("a".to_string(), "hello".to_string());
        store.insert("n".to_string(), "10".to_string());
        let mut ttl = HashMap::new();
        ttl.insert("n".to_string(), 1_999_999_999_999i64);

        save(&path, &store, &ttl).unwrap();
        let snapshot = load(&path).unwrap();
        assert_eq!(snapshot.store, store);
        assert_eq!(snapshot.ttl, ttl);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nukekv.db");
        fs::write(&path, b"{not json").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn empty_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nukekv.db");
        fs::write(&path, b"").unwrap();
        let snapshot = load(&path).unwrap();
        assert!(snapshot.store.is_empty());
    }
}
