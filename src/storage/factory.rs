//! Storage backend factory.
//!
//! Creates the appropriate storage backend based on configuration.

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::AppError;
use crate::storage::file::FileStorage;
use crate::storage::memory::MemoryStorage;
use crate::storage::postgres::PostgresStorage;
use crate::storage::schema::SCHEMA;
use crate::storage::traits::Storage;

/// Create a storage backend based on configuration.
///
/// # Returns
///
/// An `Arc<dyn Storage>` pointing to the configured storage backend.
///
/// # Errors
///
/// Returns an error if the storage backend cannot be initialized.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, AppError> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::File => Arc::new(FileStorage::new(&config.file, SCHEMA)?),
        StorageBackend::PostgreSQL => {
            Arc::new(PostgresStorage::connect(&config.postgresql, SCHEMA).await?)
        }
    };

    // Verify storage is healthy
    storage.health_check().await?;

    Ok(storage)
}
