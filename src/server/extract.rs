use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::error::ApiError;
use super::state::AppState;
use crate::auth::{bearer_token, Identity};

/// The caller identified by a verified `Authorization: Bearer <Firebase ID token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::MissingToken)?;

        let identity = state.verifier.verify(token).await.map_err(|e| {
            tracing::warn!(error = %e, "Rejected ID token");
            ApiError::Unauthorized
        })?;

        Ok(AuthUser(identity))
    }
}
