//! Machine (`Maquina`) record and its wire mapping.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::maintenance::Maintenance;
use super::validation::{FieldErrors, FieldReader, Presence};

/// Maximum length of `nombre`.
pub const NAME_MAX_CHARS: usize = 100;
/// Maximum length of `estado`.
pub const STATUS_MAX_CHARS: usize = 20;

pub const FIELD_NAME: &str = "nombre";
pub const FIELD_STATUS: &str = "estado";
pub const FIELD_LAST_MAINTENANCE: &str = "ultima_fecha_mantenimiento";

/// A tracked piece of equipment, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// System-generated identifier.
    pub id: i64,

    #[serde(rename = "nombre")]
    pub name: String,

    /// Free-form status label.
    #[serde(rename = "estado")]
    pub status: String,

    #[serde(rename = "ultima_fecha_mantenimiento")]
    pub last_maintenance_date: NaiveDate,
}

/// Writable fields of a machine, fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMachine {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "estado")]
    pub status: String,
    #[serde(rename = "ultima_fecha_mantenimiento")]
    pub last_maintenance_date: NaiveDate,
}

impl NewMachine {
    /// Parse a create/replace body. Every writable field must be present.
    ///
    /// # Errors
    ///
    /// Returns per-field errors when any field is missing or invalid.
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(body, Presence::Required)?;
        let name = reader.text(FIELD_NAME, NAME_MAX_CHARS);
        let status = reader.text(FIELD_STATUS, STATUS_MAX_CHARS);
        let last_maintenance_date = reader.date(FIELD_LAST_MAINTENANCE);
        reader.finish()?;

        match (name, status, last_maintenance_date) {
            (Some(name), Some(status), Some(last_maintenance_date)) => Ok(Self {
                name,
                status,
                last_maintenance_date,
            }),
            _ => Err(FieldErrors::new()),
        }
    }

    /// Attach an identifier.
    #[must_use]
    pub fn with_id(self, id: i64) -> Machine {
        Machine {
            id,
            name: self.name,
            status: self.status,
            last_maintenance_date: self.last_maintenance_date,
        }
    }
}

/// Fields present in a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachinePatch {
    pub name: Option<String>,
    pub status: Option<String>,
    pub last_maintenance_date: Option<NaiveDate>,
}

impl MachinePatch {
    /// Parse a partial update body. Absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns per-field errors for every present field that is invalid.
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(body, Presence::Optional)?;
        let patch = Self {
            name: reader.text(FIELD_NAME, NAME_MAX_CHARS),
            status: reader.text(FIELD_STATUS, STATUS_MAX_CHARS),
            last_maintenance_date: reader.date(FIELD_LAST_MAINTENANCE),
        };
        reader.finish()?;
        Ok(patch)
    }

    /// Merge onto the current record.
    #[must_use]
    pub fn apply(self, current: Machine) -> NewMachine {
        NewMachine {
            name: self.name.unwrap_or(current.name),
            status: self.status.unwrap_or(current.status),
            last_maintenance_date: self
                .last_maintenance_date
                .unwrap_or(current.last_maintenance_date),
        }
    }
}

/// Wire representation: the machine plus its maintenance records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineView {
    #[serde(flatten)]
    pub machine: Machine,

    /// Read-only; ignored on input.
    #[serde(rename = "mantenimientos")]
    pub maintenances: Vec<Maintenance>,
}

impl MachineView {
    #[must_use]
    pub const fn new(machine: Machine, maintenances: Vec<Maintenance>) -> Self {
        Self {
            machine,
            maintenances,
        }
    }
}
