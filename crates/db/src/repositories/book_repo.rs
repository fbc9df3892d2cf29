//! Repository for the `books` table.

use bookhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::book::{Book, BookWithOwner, CreateBook, UpdateBook};

/// Book columns shared across queries.
const COLUMNS: &str =
    "id, title, caption, rating, image_url, image_public_id, user_id, created_at, updated_at";

/// Book columns joined with the owner's display fields.
const JOINED_COLUMNS: &str = "b.id, b.title, b.caption, b.rating, b.image_url, \
     b.image_public_id, b.user_id, b.created_at, b.updated_at, u.username, u.profile_image";

/// Provides CRUD operations for books, newest-first everywhere.
pub struct BookRepo;

impl BookRepo {
    /// Insert a new book, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateBook) -> Result<Book, sqlx::Error> {
        let query = format!(
            "INSERT INTO books (title, caption, rating, image_url, image_public_id, user_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(&input.title)
            .bind(&input.caption)
            .bind(input.rating)
            .bind(&input.image_url)
            .bind(&input.image_public_id)
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    /// Find a book by ID, joined with owner display fields.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BookWithOwner>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM books b
             JOIN users u ON u.id = b.user_id
             WHERE b.id = $1"
        );
        sqlx::query_as::<_, BookWithOwner>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// One feed page, newest first. Ties on the creation timestamp break
    /// by id descending so insertion order stays stable across pages.
    pub async fn list_page(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookWithOwner>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM books b
             JOIN users u ON u.id = b.user_id
             ORDER BY b.created_at DESC, b.id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, BookWithOwner>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Total number of books (for page-count computation).
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(pool)
            .await
    }

    /// All books belonging to one owner, newest first, unpaginated.
    pub async fn list_by_owner(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<BookWithOwner>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM books b
             JOIN users u ON u.id = b.user_id
             WHERE b.user_id = $1
             ORDER BY b.created_at DESC, b.id DESC"
        );
        sqlx::query_as::<_, BookWithOwner>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Partial update. Only non-`None` fields in `input` are applied; a
    /// new `image_url` replaces `image_public_id` along with it (possibly
    /// with NULL, for externally supplied URLs).
    ///
    /// Returns `None` if no row with the given `id` exists. Ownership is
    /// checked by the caller before calling this.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBook,
    ) -> Result<Option<Book>, sqlx::Error> {
        let query = format!(
            "UPDATE books SET
                title = COALESCE($2, title),
                caption = COALESCE($3, caption),
                rating = COALESCE($4, rating),
                image_url = COALESCE($5, image_url),
                image_public_id = CASE WHEN $5 IS NULL THEN image_public_id ELSE $6 END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.caption)
            .bind(input.rating)
            .bind(&input.image_url)
            .bind(&input.image_public_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a book row. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
