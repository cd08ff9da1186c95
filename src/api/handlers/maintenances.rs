//! Maintenance resource handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::debug;

use super::{parse_id, record_request};
use crate::api::extractors::{AuthContext, JsonBody};
use crate::api::state::AppState;
use crate::domain::Maintenance;
use crate::error::{AppError, Result};

const RESOURCE: &str = "mantenimientos";

fn maintenance_id(raw: &str) -> Result<i64> {
    parse_id("Mantenimiento", raw)
}

/// List every maintenance record.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Maintenance>>> {
    record_request(RESOURCE, "list");
    Ok(Json(state.maintenance_service.list().await?))
}

/// Create a maintenance record.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<Maintenance>)> {
    record_request(RESOURCE, "create");
    debug!(principal = %auth.principal, "Creating maintenance record");

    let record = state.maintenance_service.create(&body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Retrieve one maintenance record.
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Maintenance>> {
    record_request(RESOURCE, "retrieve");
    let id = maintenance_id(&id)?;

    Ok(Json(state.maintenance_service.get(id).await?))
}

/// Replace a maintenance record (PUT).
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthContext,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<Json<Maintenance>> {
    record_request(RESOURCE, "update");
    let id = maintenance_id(&id)?;
    state.maintenance_service.require(id).await?;
    let JsonBody(body) = body?;
    debug!(id, principal = %auth.principal, "Replacing maintenance record");

    Ok(Json(state.maintenance_service.replace(id, &body).await?))
}

/// Update some fields of a maintenance record (PATCH).
pub async fn partial_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthContext,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<Json<Maintenance>> {
    record_request(RESOURCE, "partial_update");
    let id = maintenance_id(&id)?;
    state.maintenance_service.require(id).await?;
    let JsonBody(body) = body?;
    debug!(id, principal = %auth.principal, "Patching maintenance record");

    Ok(Json(state.maintenance_service.patch(id, &body).await?))
}

/// Delete a maintenance record.
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthContext,
) -> Result<StatusCode> {
    record_request(RESOURCE, "destroy");
    let id = maintenance_id(&id)?;
    debug!(id, principal = %auth.principal, "Deleting maintenance record");

    state.maintenance_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
