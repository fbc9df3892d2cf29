//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use bookhub_core::types::DbId;
use jsonwebtoken::errors::ErrorKind;

use crate::auth::jwt::validate_token;
use crate::error::{AppError, AuthReason};
use crate::state::AppState;

/// Authenticated user extracted from a JWT bearer token in the
/// `Authorization` header.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication. Rejections carry a `reason` discriminator
/// (`missing` / `invalid` / `expired`) in the 401 body so clients know
/// whether to re-login or refresh.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                reason: AuthReason::Missing,
                message: "No authentication token, access denied".into(),
            })?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized {
                reason: AuthReason::Invalid,
                message: "Invalid Authorization format. Expected: Bearer <token>".into(),
            })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                AppError::Unauthorized {
                    reason: AuthReason::Expired,
                    message: "Session expired, please login again".into(),
                }
            } else {
                AppError::Unauthorized {
                    reason: AuthReason::Invalid,
                    message: "Token is not valid".into(),
                }
            }
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
