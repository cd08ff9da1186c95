//! HTTP request handlers.

pub mod health;
pub mod machines;
pub mod maintenances;
pub mod root;
pub mod token;

use crate::error::{AppError, Result};

/// Parse a record identifier from a path segment.
///
/// A segment that is not an integer cannot name a record, so it is reported
/// the same way as an unknown identifier.
fn parse_id(resource: &str, raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("{resource} {raw}")))
}

/// Count one handled request against a resource.
fn record_request(resource: &'static str, action: &'static str) {
    metrics::counter!("maquinas_http_requests_total", "resource" => resource, "action" => action)
        .increment(1);
}
