//! Machine resource handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::debug;

use super::{parse_id, record_request};
use crate::api::extractors::{AuthContext, JsonBody};
use crate::api::state::AppState;
use crate::domain::MachineView;
use crate::error::{AppError, Result};

const RESOURCE: &str = "maquinas";

fn machine_id(raw: &str) -> Result<i64> {
    parse_id("Maquina", raw)
}

/// List every machine with its maintenance records.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<MachineView>>> {
    record_request(RESOURCE, "list");
    debug!(principal = %auth.principal, "Listing machines");

    Ok(Json(state.machine_service.list().await?))
}

/// Create a machine.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<MachineView>)> {
    record_request(RESOURCE, "create");
    debug!(principal = %auth.principal, "Creating machine");

    let view = state.machine_service.create(&body).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Retrieve one machine.
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MachineView>> {
    record_request(RESOURCE, "retrieve");
    let id = machine_id(&id)?;

    Ok(Json(state.machine_service.get(id).await?))
}

/// Replace a machine (PUT).
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthContext,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<Json<MachineView>> {
    record_request(RESOURCE, "update");
    let id = machine_id(&id)?;
    // Unknown record wins over an unreadable body
    state.machine_service.require(id).await?;
    let JsonBody(body) = body?;
    debug!(id, principal = %auth.principal, "Replacing machine");

    Ok(Json(state.machine_service.replace(id, &body).await?))
}

/// Update some fields of a machine (PATCH).
pub async fn partial_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthContext,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<Json<MachineView>> {
    record_request(RESOURCE, "partial_update");
    let id = machine_id(&id)?;
    state.machine_service.require(id).await?;
    let JsonBody(body) = body?;
    debug!(id, principal = %auth.principal, "Patching machine");

    Ok(Json(state.machine_service.patch(id, &body).await?))
}

/// Delete a machine and its maintenance records.
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthContext,
) -> Result<StatusCode> {
    record_request(RESOURCE, "destroy");
    let id = machine_id(&id)?;
    debug!(id, principal = %auth.principal, "Deleting machine");

    state.machine_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
