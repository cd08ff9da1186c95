//! Authentication context extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::future::Future;

use crate::error::AppError;
use crate::service::Principal;

/// Authentication context extracted from request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Who presented the credential.
    pub principal: Principal,
}

impl AuthContext {
    /// Create a new auth context.
    #[must_use]
    pub const fn new(principal: Principal) -> Self {
        Self { principal }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        // Set by the auth middleware
        let result = parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AppError::Unauthorized);
        std::future::ready(result)
    }
}
