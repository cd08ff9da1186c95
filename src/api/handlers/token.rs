//! Token endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::de::DeserializeOwned;

use crate::api::extractors::JsonBody;
use crate::api::state::AppState;
use crate::domain::validation::MSG_BLANK;
use crate::domain::{
    AccessTokenResponse, FieldErrors, RefreshRequest, TokenPairResponse, TokenRequest,
};
use crate::error::{AppError, Result};

fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn require(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, MSG_BLANK);
    }
}

/// Exchange username and password for an access/refresh pair.
pub async fn obtain(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<TokenPairResponse>> {
    let request: TokenRequest = decode(body)?;

    let mut errors = FieldErrors::new();
    require(&mut errors, "username", &request.username);
    require(&mut errors, "password", &request.password);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    // bcrypt is CPU-bound
    let service = Arc::clone(&state.token_service);
    let (access, refresh) = tokio::task::spawn_blocking(move || {
        service.obtain_pair(&request.username, &request.password)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(TokenPairResponse {
        access: access.token,
        refresh: refresh.token,
    }))
}

/// Exchange a refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<AccessTokenResponse>> {
    let request: RefreshRequest = decode(body)?;

    if request.refresh.is_empty() {
        let mut errors = FieldErrors::new();
        errors.add("refresh", MSG_BLANK);
        return Err(AppError::Validation(errors));
    }

    let access = state.token_service.refresh(&request.refresh)?;
    Ok(Json(AccessTokenResponse {
        access: access.token,
    }))
}
