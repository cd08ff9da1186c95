//! In-memory storage backend.
//!
//! Both tables live behind one lock, so a cascading delete is never observed
//! half-done.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Machine, Maintenance, NewMachine, NewMaintenance};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{MachineStorage, MaintenanceStorage, Storage};

#[derive(Default)]
struct Tables {
    machines: BTreeMap<i64, Machine>,
    maintenances: BTreeMap<i64, Maintenance>,
    last_machine_id: i64,
    last_maintenance_id: i64,
}

/// In-memory storage implementation.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MachineStorage for MemoryStorage {
    async fn list_machines(&self) -> StorageResult<Vec<Machine>> {
        Ok(self.tables.read().machines.values().cloned().collect())
    }

    async fn get_machine(&self, id: i64) -> StorageResult<Option<Machine>> {
        Ok(self.tables.read().machines.get(&id).cloned())
    }

    async fn insert_machine(&self, machine: &NewMachine) -> StorageResult<Machine> {
        let mut tables = self.tables.write();
        tables.last_machine_id += 1;
        let record = machine.clone().with_id(tables.last_machine_id);
        tables.machines.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_machine(
        &self,
        id: i64,
        machine: &NewMachine,
    ) -> StorageResult<Option<Machine>> {
        let mut tables = self.tables.write();
        let Some(slot) = tables.machines.get_mut(&id) else {
            return Ok(None);
        };
        *slot = machine.clone().with_id(id);
        Ok(Some(slot.clone()))
    }

    async fn delete_machine(&self, id: i64) -> StorageResult<Option<u64>> {
        let mut tables = self.tables.write();
        if tables.machines.remove(&id).is_none() {
            return Ok(None);
        }

        let before = tables.maintenances.len();
        tables.maintenances.retain(|_, record| record.machine_id != id);
        Ok(Some((before - tables.maintenances.len()) as u64))
    }

    async fn machine_exists(&self, id: i64) -> StorageResult<bool> {
        Ok(self.tables.read().machines.contains_key(&id))
    }
}

#[async_trait]
impl MaintenanceStorage for MemoryStorage {
    async fn list_maintenances(&self) -> StorageResult<Vec<Maintenance>> {
        Ok(self.tables.read().maintenances.values().cloned().collect())
    }

    async fn list_maintenances_for(&self, machine_id: i64) -> StorageResult<Vec<Maintenance>> {
        Ok(self
            .tables
            .read()
            .maintenances
            .values()
            .filter(|record| record.machine_id == machine_id)
            .cloned()
            .collect())
    }

    async fn get_maintenance(&self, id: i64) -> StorageResult<Option<Maintenance>> {
        Ok(self.tables.read().maintenances.get(&id).cloned())
    }

    async fn insert_maintenance(&self, record: &NewMaintenance) -> StorageResult<Maintenance> {
        let mut tables = self.tables.write();
        if !tables.machines.contains_key(&record.machine_id) {
            return Err(StorageError::MissingReference(record.machine_id));
        }

        tables.last_maintenance_id += 1;
        let stored = record.clone().with_id(tables.last_maintenance_id);
        tables.maintenances.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_maintenance(
        &self,
        id: i64,
        record: &NewMaintenance,
    ) -> StorageResult<Option<Maintenance>> {
        let mut tables = self.tables.write();
        if !tables.maintenances.contains_key(&id) {
            return Ok(None);
        }
        if !tables.machines.contains_key(&record.machine_id) {
            return Err(StorageError::MissingReference(record.machine_id));
        }

        let stored = record.clone().with_id(id);
        tables.maintenances.insert(id, stored.clone());
        Ok(Some(stored))
    }

    async fn delete_maintenance(&self, id: i64) -> StorageResult<bool> {
        Ok(self.tables.write().maintenances.remove(&id).is_some())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
