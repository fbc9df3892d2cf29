//! Book entity model and DTOs.

use bookhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full book row from the `books` table.
#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: DbId,
    pub title: String,
    pub caption: String,
    pub rating: i32,
    pub image_url: String,
    /// Deletable identifier at the image host. `None` for books whose
    /// image was supplied as an external URL.
    pub image_public_id: Option<String>,
    pub user_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Book row joined with its owner's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct BookWithOwner {
    pub id: DbId,
    pub title: String,
    pub caption: String,
    pub rating: i32,
    pub image_url: String,
    pub image_public_id: Option<String>,
    pub user_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub username: String,
    pub profile_image: String,
}

/// Owner display fields denormalized onto book reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: DbId,
    pub username: String,
    pub profile_image: String,
}

/// External-facing book representation with a nested owner object.
/// Serialized camelCase, the wire convention for every response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: DbId,
    pub title: String,
    pub caption: String,
    pub rating: i32,
    pub image: String,
    pub created_at: Timestamp,
    pub user: OwnerSummary,
}

impl From<BookWithOwner> for BookResponse {
    fn from(row: BookWithOwner) -> Self {
        Self {
            id: row.id,
            title: row.title,
            caption: row.caption,
            rating: row.rating,
            image: row.image_url,
            created_at: row.created_at,
            user: OwnerSummary {
                id: row.user_id,
                username: row.username,
                profile_image: row.profile_image,
            },
        }
    }
}

/// DTO for inserting a new book. Built by the handler after validation
/// and (when needed) synchronous image ingestion.
#[derive(Debug)]
pub struct CreateBook {
    pub title: String,
    pub caption: String,
    pub rating: i32,
    pub image_url: String,
    pub image_public_id: Option<String>,
    pub user_id: DbId,
}

/// DTO for a partial book update. Only `Some` fields are applied; when
/// `image_url` is set, `image_public_id` is replaced along with it.
#[derive(Debug, Default)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub rating: Option<i32>,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
}
