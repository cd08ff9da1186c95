//! Schema registry.
//!
//! The two tables, their columns and constraints, declared once and handed
//! to each backend at construction. Relational backends derive their DDL
//! from it; the file backend takes its directory names from it.

use crate::domain::machine::{NAME_MAX_CHARS, STATUS_MAX_CHARS};
use crate::domain::maintenance::KIND_MAX_CHARS;

/// Column storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// System-generated 64-bit identifier.
    Serial,
    /// Text limited to `max_chars` characters.
    Text { max_chars: usize },
    /// Calendar date.
    Date,
    /// Reference to `table.id`, removed together with the referenced row.
    CascadeReference { table: &'static str },
}

/// A single non-null column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

/// Shorthand for a text column type.
const fn text(max_chars: usize) -> ColumnType {
    ColumnType::Text { max_chars }
}

impl Column {
    const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }

    fn definition(&self) -> String {
        match self.column_type {
            ColumnType::Serial => format!("{} BIGSERIAL PRIMARY KEY", self.name),
            ColumnType::Text { max_chars } => {
                format!("{} VARCHAR({max_chars}) NOT NULL", self.name)
            }
            ColumnType::Date => format!("{} DATE NOT NULL", self.name),
            ColumnType::CascadeReference { table } => format!(
                "{} BIGINT NOT NULL REFERENCES {table} (id) ON DELETE CASCADE",
                self.name
            ),
        }
    }
}

/// A table and its columns, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    /// Statements that create the table and index its references.
    ///
    /// Every statement is idempotent.
    #[must_use]
    pub fn create_statements(&self) -> Vec<String> {
        let columns = self
            .columns
            .iter()
            .map(Column::definition)
            .collect::<Vec<_>>()
            .join(", ");

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            self.name
        )];

        for column in self.columns {
            if matches!(column.column_type, ColumnType::CascadeReference { .. }) {
                statements.push(format!(
                    "CREATE INDEX IF NOT EXISTS {table}_{column}_idx ON {table} ({column})",
                    table = self.name,
                    column = column.name
                ));
            }
        }

        statements
    }
}

/// The full schema, owners first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub machines: TableSchema,
    pub maintenances: TableSchema,
}

const MACHINE_COLUMNS: &[Column] = &[
    Column::new("id", ColumnType::Serial),
    Column::new("nombre", text(NAME_MAX_CHARS)),
    Column::new("estado", text(STATUS_MAX_CHARS)),
    Column::new("ultima_fecha_mantenimiento", ColumnType::Date),
];

const MAINTENANCE_COLUMNS: &[Column] = &[
    Column::new("id", ColumnType::Serial),
    Column::new(
        "maquina_id",
        ColumnType::CascadeReference { table: "maquinas" },
    ),
    Column::new("fecha", ColumnType::Date),
    Column::new("tipo", text(KIND_MAX_CHARS)),
];

/// Schema of the maquinas service.
pub const SCHEMA: Schema = Schema {
    machines: TableSchema {
        name: "maquinas",
        columns: MACHINE_COLUMNS,
    },
    maintenances: TableSchema {
        name: "mantenimientos",
        columns: MAINTENANCE_COLUMNS,
    },
};

impl Schema {
    /// Tables in creation order (referenced tables first).
    #[must_use]
    pub const fn tables(&self) -> [TableSchema; 2] {
        [self.machines, self.maintenances]
    }
}
