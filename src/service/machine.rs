//! Machine resource service.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{Machine, MachinePatch, MachineView, Maintenance, NewMachine};
use crate::error::{AppError, Result};
use crate::storage::{MachineStorage, MaintenanceStorage, Storage};

/// CRUD over machines, rendering each with its maintenance records.
pub struct MachineService {
    storage: Arc<dyn Storage>,
}

impl MachineService {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn not_found(id: i64) -> AppError {
        AppError::NotFound(format!("Maquina {id}"))
    }

    async fn view(&self, machine: Machine) -> Result<MachineView> {
        let maintenances = self.storage.list_maintenances_for(machine.id).await?;
        Ok(MachineView::new(machine, maintenances))
    }

    async fn existing(&self, id: i64) -> Result<Machine> {
        self.storage
            .get_machine(id)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    /// List every machine with its maintenance records.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list(&self) -> Result<Vec<MachineView>> {
        let machines = self.storage.list_machines().await?;

        let mut owned: HashMap<i64, Vec<Maintenance>> = HashMap::new();
        for record in self.storage.list_maintenances().await? {
            owned.entry(record.machine_id).or_default().push(record);
        }

        debug!(count = machines.len(), "Listed machines");
        Ok(machines
            .into_iter()
            .map(|machine| {
                let maintenances = owned.remove(&machine.id).unwrap_or_default();
                MachineView::new(machine, maintenances)
            })
            .collect())
    }

    /// Check that a machine exists without loading its maintenance records.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the machine does not exist.
    pub async fn require(&self, id: i64) -> Result<()> {
        self.existing(id).await.map(|_| ())
    }

    /// Retrieve one machine.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the machine does not exist.
    pub async fn get(&self, id: i64) -> Result<MachineView> {
        let machine = self.existing(id).await?;
        self.view(machine).await
    }

    /// Create a machine from a request body.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the body is invalid.
    pub async fn create(&self, body: &Value) -> Result<MachineView> {
        let new = NewMachine::from_json(body).map_err(AppError::Validation)?;
        let machine = self.storage.insert_machine(&new).await?;
        info!(id = machine.id, nombre = %machine.name, "Machine created");
        Ok(MachineView::new(machine, Vec::new()))
    }

    /// Replace every writable field of a machine.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the machine does not exist, `Validation` if the body is invalid.
    pub async fn replace(&self, id: i64, body: &Value) -> Result<MachineView> {
        self.existing(id).await?;
        let new = NewMachine::from_json(body).map_err(AppError::Validation)?;
        self.store(id, &new).await
    }

    /// Update only the fields present in the body.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the machine does not exist, `Validation` if the body is invalid.
    pub async fn patch(&self, id: i64, body: &Value) -> Result<MachineView> {
        let current = self.existing(id).await?;
        let patch = MachinePatch::from_json(body).map_err(AppError::Validation)?;
        self.store(id, &patch.apply(current)).await
    }

    async fn store(&self, id: i64, new: &NewMachine) -> Result<MachineView> {
        let machine = self
            .storage
            .update_machine(id, new)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        info!(id, "Machine updated");
        self.view(machine).await
    }

    /// Delete a machine and its maintenance records.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the machine does not exist.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let cascaded = self
            .storage
            .delete_machine(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        metrics::counter!("maquinas_records_deleted_total", "resource" => "maquinas").increment(1);
        metrics::counter!("maquinas_records_deleted_total", "resource" => "mantenimientos")
            .increment(cascaded);
        info!(id, cascaded, "Machine deleted");
        Ok(())
    }
}
