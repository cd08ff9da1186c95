//! Application state for Axum handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::service::{MachineService, MaintenanceService, TokenService};
use crate::storage::Storage;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Storage backend.
    pub storage: Arc<dyn Storage>,
    /// Machine resource service.
    pub machine_service: Arc<MachineService>,
    /// Maintenance resource service.
    pub maintenance_service: Arc<MaintenanceService>,
    /// Token service.
    pub token_service: Arc<TokenService>,
    /// Prometheus recorder handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: Arc<AppConfig>,
        storage: Arc<dyn Storage>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let machine_service = Arc::new(MachineService::new(Arc::clone(&storage)));
        let maintenance_service = Arc::new(MaintenanceService::new(Arc::clone(&storage)));
        let token_service = Arc::new(TokenService::new(&config.auth));

        Self {
            config,
            storage,
            machine_service,
            maintenance_service,
            token_service,
            metrics,
        }
    }
}
