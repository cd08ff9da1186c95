//! One JSON file per record, keyed by identifier.

use std::path::PathBuf;

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};

/// A directory holding `{id}.json` files of one record type.
pub struct RecordDir {
    dir: PathBuf,
}

impl RecordDir {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write a record, replacing any previous version.
    pub fn save<T: Serialize>(&self, id: i64, record: &T) -> StorageResult<()> {
        let path = self.record_path(id);

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        file.lock_exclusive()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        serde_json::to_writer_pretty(&file, record)?;
        file.sync_all()?;
        file.unlock()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok(())
    }

    /// Read a record, if present.
    pub fn load<T: DeserializeOwned>(&self, id: i64) -> StorageResult<Option<T>> {
        let path = self.record_path(id);

        if !path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(&path)?;
        file.lock_shared()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        let record: T = serde_json::from_reader(&file)?;
        file.unlock()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok(Some(record))
    }

    /// Read every record, ordered by identifier.
    ///
    /// Files that do not parse are logged and skipped.
    pub fn list<T: DeserializeOwned>(&self) -> StorageResult<Vec<T>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<i64>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(id) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(StorageError::Serialization(e)) => {
                    tracing::warn!(dir = ?self.dir, id, error = %e, "Failed to parse record file");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(records)
    }

    /// Remove a record. Returns `false` if it did not exist.
    pub fn delete(&self, id: i64) -> StorageResult<bool> {
        let path = self.record_path(id);

        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&path)?;
        Ok(true)
    }

    #[must_use]
    pub fn exists(&self, id: i64) -> bool {
        self.record_path(id).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    fn note(text: &str) -> Note {
        Note {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_list_orders_numerically_and_skips_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let dir = RecordDir::new(temp_dir.path().to_path_buf());

        for id in [10, 2, 1] {
            dir.save(id, &note(&id.to_string())).unwrap();
        }
        std::fs::write(temp_dir.path().join("3.json"), b"{not json").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        let notes: Vec<Note> = dir.list().unwrap();
        let texts: Vec<&str> = notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, ["1", "2", "10"]);
    }

    #[test]
    fn test_save_load_delete() {
        let temp_dir = TempDir::new().unwrap();
        let dir = RecordDir::new(temp_dir.path().to_path_buf());

        dir.save(5, &note("a")).unwrap();
        dir.save(5, &note("b")).unwrap();
        assert!(dir.exists(5));
        assert_eq!(dir.load::<Note>(5).unwrap(), Some(note("b")));

        assert!(dir.delete(5).unwrap());
        assert!(!dir.delete(5).unwrap());
        assert_eq!(dir.load::<Note>(5).unwrap(), None);
    }
}
