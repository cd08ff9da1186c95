//! Maintenance (`Mantenimiento`) record and its wire mapping.
//!
//! The stored record and the wire representation are the same four fields,
//! with the owning machine carried as a bare identifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::{FieldErrors, FieldReader, Presence};

/// Maximum length of `tipo`.
pub const KIND_MAX_CHARS: usize = 100;

pub const FIELD_MACHINE: &str = "maquina";
pub const FIELD_DATE: &str = "fecha";
pub const FIELD_KIND: &str = "tipo";

/// A maintenance event owned by exactly one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintenance {
    /// System-generated identifier.
    pub id: i64,

    /// Identifier of the owning machine.
    #[serde(rename = "maquina")]
    pub machine_id: i64,

    #[serde(rename = "fecha")]
    pub date: NaiveDate,

    /// Free-form description of the work done.
    #[serde(rename = "tipo")]
    pub kind: String,
}

/// Writable fields of a maintenance record, fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMaintenance {
    #[serde(rename = "maquina")]
    pub machine_id: i64,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "tipo")]
    pub kind: String,
}

impl NewMaintenance {
    /// Parse a create/replace body. Every writable field must be present.
    ///
    /// The machine reference is only checked for shape here.
    ///
    /// # Errors
    ///
    /// Returns per-field errors when any field is missing or invalid.
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(body, Presence::Required)?;
        let machine_id = reader.pk(FIELD_MACHINE);
        let date = reader.date(FIELD_DATE);
        let kind = reader.text(FIELD_KIND, KIND_MAX_CHARS);
        reader.finish()?;

        match (machine_id, date, kind) {
            (Some(machine_id), Some(date), Some(kind)) => Ok(Self {
                machine_id,
                date,
                kind,
            }),
            _ => Err(FieldErrors::new()),
        }
    }

    /// Attach an identifier.
    #[must_use]
    pub fn with_id(self, id: i64) -> Maintenance {
        Maintenance {
            id,
            machine_id: self.machine_id,
            date: self.date,
            kind: self.kind,
        }
    }
}

/// Fields present in a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenancePatch {
    pub machine_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub kind: Option<String>,
}

impl MaintenancePatch {
    /// Parse a partial update body.
    ///
    /// # Errors
    ///
    /// Returns per-field errors for every present field that is invalid.
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(body, Presence::Optional)?;
        let patch = Self {
            machine_id: reader.pk(FIELD_MACHINE),
            date: reader.date(FIELD_DATE),
            kind: reader.text(FIELD_KIND, KIND_MAX_CHARS),
        };
        reader.finish()?;
        Ok(patch)
    }

    #[must_use]
    pub fn apply(self, current: Maintenance) -> NewMaintenance {
        NewMaintenance {
            machine_id: self.machine_id.unwrap_or(current.machine_id),
            date: self.date.unwrap_or(current.date),
            kind: self.kind.unwrap_or(current.kind),
        }
    }
}
