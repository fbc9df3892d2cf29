use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookhub_core::error::CoreError;
use bookhub_core::upload::ChunkError;
use bookhub_images::IngestError;
use serde_json::json;

/// Why a request failed authentication; clients branch on this to decide
/// between re-login and token refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthReason {
    /// No usable bearer credential in the `Authorization` header.
    Missing,
    /// The token failed signature or structural validation, or its user
    /// no longer exists.
    Invalid,
    /// The token was valid but its expiry has passed.
    Expired,
}

impl AuthReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthReason::Missing => "missing",
            AuthReason::Invalid => "invalid",
            AuthReason::Expired => "expired",
        }
    }
}

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds transport-specific
/// variants. Implements [`IntoResponse`] to produce the
/// `{ "success": false, "message": ... }` envelope on every failure.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `bookhub-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A chunked-upload protocol error.
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// The image host rejected or failed an ingestion call.
    #[error("Image service error: {0}")]
    Ingestion(#[from] IngestError),

    /// Authentication failed, with a machine-readable reason.
    #[error("Unauthorized: {message}")]
    Unauthorized { reason: AuthReason, message: String },

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                // Ownership mismatch is 401, not 403: clients treat it the
                // same as any other unauthorized action. No `reason` field;
                // that discriminator is reserved for token problems.
                CoreError::Forbidden(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::Database(err) => classify_sqlx_error(err),

            // Chunk protocol violations are client errors; the session is
            // left exactly as the store decided (mismatches mutate nothing).
            AppError::Chunk(err) => (StatusCode::BAD_REQUEST, err.to_string()),

            // Upstream detail is included so clients can distinguish a
            // timeout from a rejection; the session is already discarded.
            AppError::Ingestion(err) => {
                tracing::error!(error = %err, "Image ingestion failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to upload image to cloud storage: {err}"),
                )
            }

            AppError::Unauthorized { reason, message } => {
                let body = json!({
                    "success": false,
                    "message": message,
                    "reason": reason.as_str(),
                });
                return (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response();
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`)
///   map to 400 with a duplicate-value message.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::BAD_REQUEST,
                        "A record with that value already exists".to_string(),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn core_errors_map_to_expected_statuses() {
        assert_eq!(
            status_of(AppError::Core(CoreError::NotFound {
                entity: "Book",
                id: 1
            })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Validation("bad".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Internal("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn ownership_mismatch_is_unauthorized() {
        // Acting on someone else's book yields 401, like the rest of the
        // unauthorized family, not 403.
        let err = AppError::Core(CoreError::Forbidden(
            "You can only delete your own books".into(),
        ));
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn chunk_errors_are_client_errors() {
        let err = AppError::Chunk(ChunkError::TotalsMismatch {
            expected: 3,
            got: 5,
        });
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }
}
