//! File-backed identifier counters, one per table.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Persisted counter state.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SequenceState {
    /// Last identifier handed out; 0 when none has been.
    last_value: i64,
    /// Last update time in Unix milliseconds.
    updated_at: i64,
}

/// Identifier sequences stored as `{table}.json`.
pub struct FileSequence {
    sequences_dir: PathBuf,
}

impl FileSequence {
    #[must_use]
    pub const fn new(sequences_dir: PathBuf) -> Self {
        Self { sequences_dir }
    }

    fn sequence_path(&self, table: &str) -> PathBuf {
        self.sequences_dir.join(format!("{table}.json"))
    }

    /// Reserve the next identifier for `table`.
    ///
    /// The counter file is created on first use. Identifiers are never reused,
    /// even after the records holding them are deleted.
    pub fn next_id(&self, table: &str) -> StorageResult<i64> {
        let path = self.sequence_path(table);

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.lock_exclusive()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let mut state: SequenceState = if contents.trim().is_empty() {
            SequenceState::default()
        } else {
            serde_json::from_str(&contents)?
        };

        state.last_value += 1;
        state.updated_at = chrono::Utc::now().timestamp_millis();

        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(serde_json::to_string_pretty(&state)?.as_bytes())?;
        file.sync_all()?;

        file.unlock()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok(state.last_value)
    }
}
