//! Route definitions for the `/api/books` resource.

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::handlers::{books, upload};
use crate::state::AppState;

/// GET /api/books/health -- liveness probe, always 200.
pub async fn health() -> Json<Value> {
    Json(json!({ "success": true, "message": "Api is working" }))
}

/// Routes mounted at `/api/books`.
///
/// ```text
/// POST   /upload-image  -> chunked cover upload (auth)
/// POST   /              -> create (auth)
/// GET    /              -> paginated feed (auth)
/// GET    /user-books    -> caller's books (auth)
/// GET    /health        -> liveness, always 200
/// GET    /{id}          -> detail (public)
/// PUT    /{id}          -> partial update, owner only
/// DELETE /{id}          -> delete + best-effort image cleanup, owner only
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload-image", post(upload::upload_image))
        .route("/", post(books::create).get(books::list))
        .route("/user-books", get(books::user_books))
        .route("/health", get(health))
        .route(
            "/{id}",
            get(books::get_by_id)
                .put(books::update)
                .delete(books::delete),
        )
}
