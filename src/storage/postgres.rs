//! `PostgreSQL` storage backend.
//!
//! Tables are created from the schema registry at connect time. The
//! maintenance table's foreign key carries `ON DELETE CASCADE`; machine
//! deletion additionally removes dependents explicitly inside one
//! transaction so it can report how many went with it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::PostgresStorageConfig;
use crate::domain::{Machine, Maintenance, NewMachine, NewMaintenance};
use crate::error::{StorageError, StorageResult};
use crate::storage::schema::Schema;
use crate::storage::traits::{MachineStorage, MaintenanceStorage, Storage};

#[derive(sqlx::FromRow)]
struct MachineRow {
    id: i64,
    nombre: String,
    estado: String,
    ultima_fecha_mantenimiento: NaiveDate,
}

impl From<MachineRow> for Machine {
    fn from(row: MachineRow) -> Self {
        Self {
            id: row.id,
            name: row.nombre,
            status: row.estado,
            last_maintenance_date: row.ultima_fecha_mantenimiento,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MaintenanceRow {
    id: i64,
    maquina_id: i64,
    fecha: NaiveDate,
    tipo: String,
}

impl From<MaintenanceRow> for Maintenance {
    fn from(row: MaintenanceRow) -> Self {
        Self {
            id: row.id,
            machine_id: row.maquina_id,
            date: row.fecha,
            kind: row.tipo,
        }
    }
}

/// SQL text, rendered once against the schema's table names.
struct Queries {
    list_machines: String,
    get_machine: String,
    insert_machine: String,
    update_machine: String,
    delete_owned: String,
    delete_machine: String,
    machine_exists: String,
    list_maintenances: String,
    list_maintenances_for: String,
    get_maintenance: String,
    insert_maintenance: String,
    update_maintenance: String,
    delete_maintenance: String,
}

impl Queries {
    fn new(schema: &Schema) -> Self {
        let machines = schema.machines.name;
        let maintenances = schema.maintenances.name;
        let machine_cols = "id, nombre, estado, ultima_fecha_mantenimiento";
        let maintenance_cols = "id, maquina_id, fecha, tipo";

        Self {
            list_machines: format!("SELECT {machine_cols} FROM {machines} ORDER BY id"),
            get_machine: format!("SELECT {machine_cols} FROM {machines} WHERE id = $1"),
            insert_machine: format!(
                "INSERT INTO {machines} (nombre, estado, ultima_fecha_mantenimiento) \
                 VALUES ($1, $2, $3) RETURNING {machine_cols}"
            ),
            update_machine: format!(
                "UPDATE {machines} SET nombre = $2, estado = $3, ultima_fecha_mantenimiento = $4 \
                 WHERE id = $1 RETURNING {machine_cols}"
            ),
            delete_owned: format!(
                "WITH removed AS (DELETE FROM {maintenances} WHERE maquina_id = $1 RETURNING id) \
                 SELECT COUNT(*) FROM removed"
            ),
            delete_machine: format!("DELETE FROM {machines} WHERE id = $1"),
            machine_exists: format!("SELECT EXISTS(SELECT 1 FROM {machines} WHERE id = $1)"),
            list_maintenances: format!("SELECT {maintenance_cols} FROM {maintenances} ORDER BY id"),
            list_maintenances_for: format!(
                "SELECT {maintenance_cols} FROM {maintenances} WHERE maquina_id = $1 ORDER BY id"
            ),
            get_maintenance: format!("SELECT {maintenance_cols} FROM {maintenances} WHERE id = $1"),
            insert_maintenance: format!(
                "INSERT INTO {maintenances} (maquina_id, fecha, tipo) \
                 VALUES ($1, $2, $3) RETURNING {maintenance_cols}"
            ),
            update_maintenance: format!(
                "UPDATE {maintenances} SET maquina_id = $2, fecha = $3, tipo = $4 \
                 WHERE id = $1 RETURNING {maintenance_cols}"
            ),
            delete_maintenance: format!("DELETE FROM {maintenances} WHERE id = $1"),
        }
    }
}

/// Map a foreign key violation on a maintenance write to `MissingReference`.
fn reference_error(err: sqlx::Error, machine_id: i64) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StorageError::MissingReference(machine_id)
        }
        _ => err.into(),
    }
}

/// `PostgreSQL` storage implementation.
pub struct PostgresStorage {
    pool: PgPool,
    queries: Queries,
}

impl PostgresStorage {
    /// Connect, then create any missing tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or the schema cannot be applied.
    pub async fn connect(config: &PostgresStorageConfig, schema: Schema) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for table in schema.tables() {
            for statement in table.create_statements() {
                sqlx::query(&statement).execute(&pool).await?;
            }
            tracing::debug!(table = table.name, "Schema applied");
        }

        Ok(Self {
            pool,
            queries: Queries::new(&schema),
        })
    }
}

#[async_trait]
impl MachineStorage for PostgresStorage {
    async fn list_machines(&self) -> StorageResult<Vec<Machine>> {
        let rows = sqlx::query_as::<_, MachineRow>(&self.queries.list_machines)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Machine::from).collect())
    }

    async fn get_machine(&self, id: i64) -> StorageResult<Option<Machine>> {
        let row = sqlx::query_as::<_, MachineRow>(&self.queries.get_machine)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Machine::from))
    }

    async fn insert_machine(&self, machine: &NewMachine) -> StorageResult<Machine> {
        let row = sqlx::query_as::<_, MachineRow>(&self.queries.insert_machine)
            .bind(&machine.name)
            .bind(&machine.status)
            .bind(machine.last_maintenance_date)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_machine(
        &self,
        id: i64,
        machine: &NewMachine,
    ) -> StorageResult<Option<Machine>> {
        let row = sqlx::query_as::<_, MachineRow>(&self.queries.update_machine)
            .bind(id)
            .bind(&machine.name)
            .bind(&machine.status)
            .bind(machine.last_maintenance_date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Machine::from))
    }

    async fn delete_machine(&self, id: i64) -> StorageResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let removed: i64 = sqlx::query_scalar(&self.queries.delete_owned)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let result = sqlx::query(&self.queries.delete_machine)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(u64::try_from(removed).unwrap_or_default()))
    }

    async fn machine_exists(&self, id: i64) -> StorageResult<bool> {
        let exists: bool = sqlx::query_scalar(&self.queries.machine_exists)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl MaintenanceStorage for PostgresStorage {
    async fn list_maintenances(&self) -> StorageResult<Vec<Maintenance>> {
        let rows = sqlx::query_as::<_, MaintenanceRow>(&self.queries.list_maintenances)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Maintenance::from).collect())
    }

    async fn list_maintenances_for(&self, machine_id: i64) -> StorageResult<Vec<Maintenance>> {
        let rows = sqlx::query_as::<_, MaintenanceRow>(&self.queries.list_maintenances_for)
            .bind(machine_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Maintenance::from).collect())
    }

    async fn get_maintenance(&self, id: i64) -> StorageResult<Option<Maintenance>> {
        let row = sqlx::query_as::<_, MaintenanceRow>(&self.queries.get_maintenance)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Maintenance::from))
    }

    async fn insert_maintenance(&self, record: &NewMaintenance) -> StorageResult<Maintenance> {
        let row = sqlx::query_as::<_, MaintenanceRow>(&self.queries.insert_maintenance)
            .bind(record.machine_id)
            .bind(record.date)
            .bind(&record.kind)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| reference_error(e, record.machine_id))?;
        Ok(row.into())
    }

    async fn update_maintenance(
        &self,
        id: i64,
        record: &NewMaintenance,
    ) -> StorageResult<Option<Maintenance>> {
        let row = sqlx::query_as::<_, MaintenanceRow>(&self.queries.update_maintenance)
            .bind(id)
            .bind(record.machine_id)
            .bind(record.date)
            .bind(&record.kind)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| reference_error(e, record.machine_id))?;
        Ok(row.map(Maintenance::from))
    }

    async fn delete_maintenance(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query(&self.queries.delete_maintenance)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|_| StorageError::Unavailable)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}
