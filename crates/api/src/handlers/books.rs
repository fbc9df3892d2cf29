//! Handlers for the `/api/books` resource: create, feed, owner listing,
//! detail, partial update, and delete with best-effort remote image
//! cleanup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bookhub_core::error::CoreError;
use bookhub_core::pagination::PageRequest;
use bookhub_core::types::DbId;
use bookhub_db::models::book::{BookResponse, CreateBook, UpdateBook};
use bookhub_db::repositories::BookRepo;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/books`.
///
/// All four fields are required; they are optional here so missing values
/// surface as a single validation message rather than a deserialization
/// rejection. `rating` accepts a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<Value>,
    /// Deletable id returned by the upload endpoint. Optional; derived
    /// from the URL when absent.
    pub image_public_id: Option<String>,
}

/// Request body for `PUT /api/books/{id}`. Only supplied fields change.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub rating: Option<Value>,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
}

/// Query parameters for the paginated feed (`?page=&limit=`).
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Trim a required text field, rejecting absent or whitespace-only values.
fn require_trimmed(value: Option<&str>, field: &str) -> Result<String, CoreError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::Validation(format!(
            "Field '{field}' is required and must not be empty"
        ))),
    }
}

/// Coerce a JSON rating value (number or numeric string) to an integer.
fn coerce_rating(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().map(|v| v as i32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce and range-check a rating. The accepted range is 1..=5; the
/// original system coerced without bounds, we validate deliberately.
fn validate_rating(value: &Value) -> Result<i32, CoreError> {
    match coerce_rating(value) {
        Some(r) if (1..=5).contains(&r) => Ok(r),
        _ => Err(CoreError::Validation(
            "Rating must be a number between 1 and 5".into(),
        )),
    }
}

/// Resolve the image fields for a create/update request.
///
/// A `data:image/` payload is ingested synchronously (fallback path for
/// small images that skip chunking). A URL owned by the image host is
/// stored as-is, preferring the explicitly supplied public id over
/// derivation from the URL path. Anything else is rejected.
async fn resolve_image(
    state: &AppState,
    image_url: &str,
    explicit_public_id: Option<String>,
) -> AppResult<(String, Option<String>)> {
    if image_url.starts_with("data:image/") {
        let stored = state.images.ingest(image_url).await?;
        Ok((stored.url, Some(stored.public_id)))
    } else if state.images.owns_url(image_url) {
        let public_id = explicit_public_id.or_else(|| state.images.public_id_from_url(image_url));
        Ok((image_url.to_string(), public_id))
    } else {
        Err(AppError::Core(CoreError::Validation(
            "Invalid image URL".into(),
        )))
    }
}

/// Fetch a book and verify the requester owns it.
async fn fetch_owned(
    state: &AppState,
    id: DbId,
    requester: DbId,
    action: &str,
) -> AppResult<bookhub_db::models::book::BookWithOwner> {
    let book = BookRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Book", id }))?;

    if book.user_id != requester {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "You can only {action} your own books"
        ))));
    }
    Ok(book)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/books
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if input.title.is_none()
        || input.caption.is_none()
        || input.image_url.is_none()
        || input.rating.is_none()
    {
        return Err(CoreError::Validation(
            "Please provide all fields for the book".into(),
        )
        .into());
    }

    let title = require_trimmed(input.title.as_deref(), "title")?;
    let caption = require_trimmed(input.caption.as_deref(), "caption")?;
    let rating = validate_rating(input.rating.as_ref().unwrap())?;
    let image_url = require_trimmed(input.image_url.as_deref(), "imageUrl")?;

    let (image_url, image_public_id) =
        resolve_image(&state, &image_url, input.image_public_id).await?;

    let book = BookRepo::create(
        &state.pool,
        &CreateBook {
            title,
            caption,
            rating,
            image_url,
            image_public_id,
            user_id: user.user_id,
        },
    )
    .await?;

    let created = BookRepo::find_by_id(&state.pool, book.id)
        .await?
        .map(BookResponse::from)
        .ok_or_else(|| AppError::InternalError("Created book vanished".into()))?;

    tracing::info!(book_id = book.id, user_id = user.user_id, "book created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "New book has been added.",
            "book": created,
        })),
    ))
}

/// GET /api/books?page=&limit=
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Value>> {
    let page = PageRequest::from_raw(query.page, query.limit);

    let rows = BookRepo::list_page(&state.pool, page.limit, page.offset()).await?;
    let total_books = BookRepo::count(&state.pool).await?;

    let books: Vec<BookResponse> = rows.into_iter().map(BookResponse::from).collect();

    Ok(Json(json!({
        "books": books,
        "currentPage": page.page,
        "totalBooks": total_books,
        "totalPages": page.total_pages(total_books),
    })))
}

/// GET /api/books/user-books
pub async fn user_books(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<BookResponse>>> {
    let rows = BookRepo::list_by_owner(&state.pool, user.user_id).await?;
    Ok(Json(rows.into_iter().map(BookResponse::from).collect()))
}

/// GET /api/books/{id} (public)
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Value>> {
    let book = BookRepo::find_by_id(&state.pool, id)
        .await?
        .map(BookResponse::from)
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Book", id }))?;

    Ok(Json(json!({ "book": book })))
}

/// PUT /api/books/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateBookRequest>,
) -> AppResult<Json<Value>> {
    fetch_owned(&state, id, user.user_id, "update").await?;

    let mut changes = UpdateBook::default();

    if input.title.is_some() {
        changes.title = Some(require_trimmed(input.title.as_deref(), "title")?);
    }
    if input.caption.is_some() {
        changes.caption = Some(require_trimmed(input.caption.as_deref(), "caption")?);
    }
    if let Some(rating) = &input.rating {
        changes.rating = Some(validate_rating(rating)?);
    }
    if let Some(image_url) = &input.image_url {
        let (url, public_id) = resolve_image(&state, image_url, input.image_public_id).await?;
        changes.image_url = Some(url);
        changes.image_public_id = public_id;
    }

    let updated = BookRepo::update(&state.pool, id, &changes)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Book", id }))?;

    let book = BookRepo::find_by_id(&state.pool, updated.id)
        .await?
        .map(BookResponse::from)
        .ok_or_else(|| AppError::InternalError("Updated book vanished".into()))?;

    tracing::info!(book_id = id, user_id = user.user_id, "book updated");

    Ok(Json(json!({
        "success": true,
        "message": "Book updated successfully",
        "book": book,
    })))
}

/// DELETE /api/books/{id}
///
/// The book row removal is the primary, irreversible operation. When the
/// stored image came from the ingestion client, its remote copy is
/// deleted best-effort first; a failure there is logged and reported in
/// the message but never blocks the deletion.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Value>> {
    let book = fetch_owned(&state, id, user.user_id, "delete").await?;

    let public_id = book.image_public_id.clone().or_else(|| {
        if state.images.owns_url(&book.image_url) {
            state.images.public_id_from_url(&book.image_url)
        } else {
            None
        }
    });

    let mut image_cleanup_failed = false;
    if let Some(public_id) = public_id {
        if let Err(e) = state.images.delete(&public_id).await {
            image_cleanup_failed = true;
            tracing::warn!(
                book_id = id,
                public_id = %public_id,
                error = %e,
                "remote image cleanup failed, continuing with book deletion"
            );
        }
    }

    let deleted = BookRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound { entity: "Book", id }));
    }

    tracing::info!(book_id = id, user_id = user.user_id, "book deleted");

    let message = if image_cleanup_failed {
        "Book deleted successfully (remote image cleanup failed)"
    } else {
        "Book deleted successfully"
    };

    Ok(Json(json!({ "success": true, "message": message })))
}
