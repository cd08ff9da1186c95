//! Storage trait definitions.
//!
//! These traits define the interface for storage backends, enabling swapping
//! between different implementations without changing business logic.

use async_trait::async_trait;

use crate::domain::{Machine, Maintenance, NewMachine, NewMaintenance};
use crate::error::StorageResult;

/// Machine record operations.
#[async_trait]
pub trait MachineStorage: Send + Sync {
    /// List all machines ordered by identifier.
    async fn list_machines(&self) -> StorageResult<Vec<Machine>>;

    /// Get a machine by identifier.
    async fn get_machine(&self, id: i64) -> StorageResult<Option<Machine>>;

    /// Insert a machine, assigning a fresh identifier.
    async fn insert_machine(&self, machine: &NewMachine) -> StorageResult<Machine>;

    /// Overwrite every writable field of an existing machine.
    ///
    /// Returns `None` if no machine has this identifier.
    async fn update_machine(
        &self,
        id: i64,
        machine: &NewMachine,
    ) -> StorageResult<Option<Machine>>;

    /// Delete a machine together with every maintenance record it owns.
    ///
    /// # Returns
    ///
    /// `None` if no machine has this identifier, otherwise the number of
    /// maintenance records removed with it.
    async fn delete_machine(&self, id: i64) -> StorageResult<Option<u64>>;

    /// Check whether a machine exists.
    async fn machine_exists(&self, id: i64) -> StorageResult<bool>;
}

/// Maintenance record operations.
///
/// Writes fail with [`StorageError::MissingReference`] when the referenced
/// machine does not exist, and nothing is persisted.
///
/// [`StorageError::MissingReference`]: crate::error::StorageError::MissingReference
#[async_trait]
pub trait MaintenanceStorage: Send + Sync {
    /// List all maintenance records ordered by identifier.
    async fn list_maintenances(&self) -> StorageResult<Vec<Maintenance>>;

    /// List the maintenance records owned by one machine, ordered by identifier.
    async fn list_maintenances_for(&self, machine_id: i64) -> StorageResult<Vec<Maintenance>>;

    /// Get a maintenance record by identifier.
    async fn get_maintenance(&self, id: i64) -> StorageResult<Option<Maintenance>>;

    /// Insert a maintenance record, assigning a fresh identifier.
    async fn insert_maintenance(&self, record: &NewMaintenance) -> StorageResult<Maintenance>;

    /// Overwrite every writable field of an existing maintenance record.
    ///
    /// Returns `None` if no record has this identifier.
    async fn update_maintenance(
        &self,
        id: i64,
        record: &NewMaintenance,
    ) -> StorageResult<Option<Maintenance>>;

    /// Delete a maintenance record. Returns `false` if it did not exist.
    async fn delete_maintenance(&self, id: i64) -> StorageResult<bool>;
}

/// Combined storage trait for all storage operations.
#[async_trait]
pub trait Storage: MachineStorage + MaintenanceStorage {
    /// Check if the storage backend is healthy and reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Get the storage backend name.
    fn backend_name(&self) -> &'static str;
}
