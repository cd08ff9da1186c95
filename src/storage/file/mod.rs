//! File-based storage backend.
//!
//! This backend stores each record as a JSON file with file locking.
//! Suitable for development and single-node deployments.
//!
//! Directory structure (table names come from the schema registry):
//! ```text
//! data/
//! ├── maquinas/
//! │   └── {id}.json
//! ├── mantenimientos/
//! │   └── {id}.json
//! └── sequences/
//!     └── {table}.json
//! ```

mod records;
mod sequence;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::FileStorageConfig;
use crate::domain::{Machine, Maintenance, NewMachine, NewMaintenance};
use crate::error::{StorageError, StorageResult};
use crate::storage::schema::Schema;
use crate::storage::traits::{MachineStorage, MaintenanceStorage, Storage};

pub use records::RecordDir;
pub use sequence::FileSequence;

/// File-based storage implementation.
pub struct FileStorage {
    /// Base data directory.
    base_dir: PathBuf,
    schema: Schema,
    machines: RecordDir,
    maintenances: RecordDir,
    sequences: FileSequence,
    /// Serializes operations within this process so cascades are not interleaved.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create a new file storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be created.
    pub fn new(config: &FileStorageConfig, schema: Schema) -> StorageResult<Self> {
        let base_dir = config.data_dir.clone();

        Self::ensure_directories(&base_dir, &schema)?;

        Ok(Self {
            machines: RecordDir::new(base_dir.join(schema.machines.name)),
            maintenances: RecordDir::new(base_dir.join(schema.maintenances.name)),
            sequences: FileSequence::new(base_dir.join("sequences")),
            schema,
            lock: Mutex::new(()),
            base_dir,
        })
    }

    /// Ensure all required directories exist.
    fn ensure_directories(base_dir: &Path, schema: &Schema) -> StorageResult<()> {
        let mut dirs = vec![base_dir.to_path_buf(), base_dir.join("sequences")];
        dirs.extend(schema.tables().iter().map(|table| base_dir.join(table.name)));

        for dir in &dirs {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::FileIO(format!("Failed to create directory {}: {e}", dir.display()))
            })?;
        }

        Ok(())
    }

    fn owned_by(&self, machine_id: i64) -> StorageResult<Vec<Maintenance>> {
        let mut records: Vec<Maintenance> = self.maintenances.list()?;
        records.retain(|record| record.machine_id == machine_id);
        Ok(records)
    }
}

#[async_trait]
impl MachineStorage for FileStorage {
    async fn list_machines(&self) -> StorageResult<Vec<Machine>> {
        let _guard = self.lock.lock().await;
        self.machines.list()
    }

    async fn get_machine(&self, id: i64) -> StorageResult<Option<Machine>> {
        let _guard = self.lock.lock().await;
        self.machines.load(id)
    }

    async fn insert_machine(&self, machine: &NewMachine) -> StorageResult<Machine> {
        let _guard = self.lock.lock().await;
        let id = self.sequences.next_id(self.schema.machines.name)?;
        let record = machine.clone().with_id(id);
        self.machines.save(id, &record)?;
        Ok(record)
    }

    async fn update_machine(
        &self,
        id: i64,
        machine: &NewMachine,
    ) -> StorageResult<Option<Machine>> {
        let _guard = self.lock.lock().await;
        if !self.machines.exists(id) {
            return Ok(None);
        }
        let record = machine.clone().with_id(id);
        self.machines.save(id, &record)?;
        Ok(Some(record))
    }

    async fn delete_machine(&self, id: i64) -> StorageResult<Option<u64>> {
        let _guard = self.lock.lock().await;
        if !self.machines.exists(id) {
            return Ok(None);
        }

        // Dependents go first so a crash midway never leaves dangling references.
        let mut removed = 0;
        for record in self.owned_by(id)? {
            if self.maintenances.delete(record.id)? {
                removed += 1;
            }
        }
        self.machines.delete(id)?;

        Ok(Some(removed))
    }

    async fn machine_exists(&self, id: i64) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;
        Ok(self.machines.exists(id))
    }
}

#[async_trait]
impl MaintenanceStorage for FileStorage {
    async fn list_maintenances(&self) -> StorageResult<Vec<Maintenance>> {
        let _guard = self.lock.lock().await;
        self.maintenances.list()
    }

    async fn list_maintenances_for(&self, machine_id: i64) -> StorageResult<Vec<Maintenance>> {
        let _guard = self.lock.lock().await;
        self.owned_by(machine_id)
    }

    async fn get_maintenance(&self, id: i64) -> StorageResult<Option<Maintenance>> {
        let _guard = self.lock.lock().await;
        self.maintenances.load(id)
    }

    async fn insert_maintenance(&self, record: &NewMaintenance) -> StorageResult<Maintenance> {
        let _guard = self.lock.lock().await;
        if !self.machines.exists(record.machine_id) {
            return Err(StorageError::MissingReference(record.machine_id));
        }

        let id = self.sequences.next_id(self.schema.maintenances.name)?;
        let stored = record.clone().with_id(id);
        self.maintenances.save(id, &stored)?;
        Ok(stored)
    }

    async fn update_maintenance(
        &self,
        id: i64,
        record: &NewMaintenance,
    ) -> StorageResult<Option<Maintenance>> {
        let _guard = self.lock.lock().await;
        if !self.maintenances.exists(id) {
            return Ok(None);
        }
        if !self.machines.exists(record.machine_id) {
            return Err(StorageError::MissingReference(record.machine_id));
        }

        let stored = record.clone().with_id(id);
        self.maintenances.save(id, &stored)?;
        Ok(Some(stored))
    }

    async fn delete_maintenance(&self, id: i64) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;
        self.maintenances.delete(id)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn health_check(&self) -> StorageResult<()> {
        if !self.base_dir.exists() {
            return Err(StorageError::Unavailable);
        }

        // Try to create a test file
        let test_file = self.base_dir.join(".health_check");
        tokio::fs::write(&test_file, b"ok")
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check failed: {e}")))?;
        tokio::fs::remove_file(&test_file)
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check cleanup failed: {e}")))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
