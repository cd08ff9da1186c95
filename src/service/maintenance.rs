//! Maintenance resource service.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::domain::maintenance::FIELD_MACHINE;
use crate::domain::validation::missing_pk_message;
use crate::domain::{
    FieldErrors, FieldReader, Maintenance, MaintenancePatch, NewMaintenance, Presence,
};
use crate::error::{AppError, Result, StorageError};
use crate::storage::{MachineStorage, MaintenanceStorage, Storage};

/// CRUD over maintenance records.
///
/// A write naming a machine that does not exist is reported as a validation
/// error on `maquina`, whether it is caught here or by the backend.
pub struct MaintenanceService {
    storage: Arc<dyn Storage>,
}

fn missing_machine(machine_id: i64) -> AppError {
    AppError::field(FIELD_MACHINE, missing_pk_message(machine_id))
}

/// The machine a body refers to, if its `maquina` is a usable identifier.
fn referenced_machine(body: &Value) -> Option<i64> {
    let mut reader = FieldReader::new(body, Presence::Optional).ok()?;
    reader.pk(FIELD_MACHINE)
}

fn write_error(err: StorageError) -> AppError {
    match err {
        StorageError::MissingReference(machine_id) => missing_machine(machine_id),
        other => AppError::Storage(other),
    }
}

impl MaintenanceService {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn not_found(id: i64) -> AppError {
        AppError::NotFound(format!("Mantenimiento {id}"))
    }

    async fn existing(&self, id: i64) -> Result<Maintenance> {
        self.storage
            .get_maintenance(id)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    /// Turn a parse result into a service result.
    ///
    /// When other fields fail, a well-formed `maquina` naming a missing
    /// machine is reported alongside them.
    async fn validated<T>(
        &self,
        body: &Value,
        parsed: std::result::Result<T, FieldErrors>,
    ) -> Result<T> {
        let mut errors = match parsed {
            Ok(value) => return Ok(value),
            Err(errors) => errors,
        };

        if errors.get(FIELD_MACHINE).is_none()
            && let Some(machine_id) = referenced_machine(body)
            && !self.storage.machine_exists(machine_id).await?
        {
            errors.add(FIELD_MACHINE, missing_pk_message(machine_id));
        }
        Err(AppError::Validation(errors))
    }

    async fn check_machine(&self, machine_id: i64) -> Result<()> {
        if self.storage.machine_exists(machine_id).await? {
            Ok(())
        } else {
            Err(missing_machine(machine_id))
        }
    }

    /// List every maintenance record.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list(&self) -> Result<Vec<Maintenance>> {
        let records = self.storage.list_maintenances().await?;
        debug!(count = records.len(), "Listed maintenance records");
        Ok(records)
    }

    /// Check that a maintenance record exists.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist.
    pub async fn require(&self, id: i64) -> Result<()> {
        self.existing(id).await.map(|_| ())
    }

    /// Retrieve one maintenance record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist.
    pub async fn get(&self, id: i64) -> Result<Maintenance> {
        self.existing(id).await
    }

    /// Create a maintenance record from a request body.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the body is invalid or names a missing machine.
    pub async fn create(&self, body: &Value) -> Result<Maintenance> {
        let new = self.validated(body, NewMaintenance::from_json(body)).await?;
        self.check_machine(new.machine_id).await?;

        let record = self
            .storage
            .insert_maintenance(&new)
            .await
            .map_err(write_error)?;
        info!(id = record.id, maquina = record.machine_id, "Maintenance created");
        Ok(record)
    }

    /// Replace every writable field of a maintenance record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist, `Validation` if the body is invalid.
    pub async fn replace(&self, id: i64, body: &Value) -> Result<Maintenance> {
        self.existing(id).await?;
        let new = self.validated(body, NewMaintenance::from_json(body)).await?;
        self.store(id, &new).await
    }

    /// Update only the fields present in the body.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist, `Validation` if the body is invalid.
    pub async fn patch(&self, id: i64, body: &Value) -> Result<Maintenance> {
        let current = self.existing(id).await?;
        let patch = self
            .validated(body, MaintenancePatch::from_json(body))
            .await?;
        self.store(id, &patch.apply(current)).await
    }

    async fn store(&self, id: i64, new: &NewMaintenance) -> Result<Maintenance> {
        self.check_machine(new.machine_id).await?;

        let record = self
            .storage
            .update_maintenance(id, new)
            .await
            .map_err(write_error)?
            .ok_or_else(|| Self::not_found(id))?;
        info!(id, maquina = record.machine_id, "Maintenance updated");
        Ok(record)
    }

    /// Delete a maintenance record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist.
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.storage.delete_maintenance(id).await? {
            return Err(Self::not_found(id));
        }

        metrics::counter!("maquinas_records_deleted_total", "resource" => "mantenimientos")
            .increment(1);
        info!(id, "Maintenance deleted");
        Ok(())
    }
}
