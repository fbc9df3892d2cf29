//! Domain-level error taxonomy shared across crates.

use crate::types::DbId;

/// Errors produced by domain logic, independent of any transport.
///
/// The API crate maps these onto HTTP statuses and the
/// `{ "success": false, "message": ... }` response envelope.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup by id found nothing.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed validation at the domain boundary.
    #[error("{0}")]
    Validation(String),

    /// The caller is authenticated but not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// An unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}
