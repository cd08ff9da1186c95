//! Authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header::AUTHORIZATION, header::WWW_AUTHENTICATE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::extractors::AuthContext;
use crate::api::state::AppState;
use crate::error::AppError;

/// Extract bearer token from Authorization header.
fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    let auth_header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;

    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Create an unauthorized response carrying a bearer challenge.
fn unauthorized_response() -> Response {
    let mut response = AppError::Unauthorized.into_response();
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

/// Middleware that requires a valid static API token or access token.
///
/// Rejected requests never reach a handler, so no data is read or written.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(principal) =
        extract_bearer_token(&req).and_then(|token| state.token_service.authenticate(token))
    else {
        return unauthorized_response();
    };

    req.extensions_mut().insert(AuthContext::new(principal));

    next.run(req).await
}
