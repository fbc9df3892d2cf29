//! HTTP-level integration tests for the book resource.
//!
//! These run against a real Postgres instance provisioned per test by
//! `sqlx::test`, with the image host mocked, covering ownership
//! enforcement, partial updates, newest-first listing, and best-effort
//! remote image cleanup on delete.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use bookhub_api::auth::password::hash_password;
use bookhub_db::models::book::{Book, CreateBook};
use bookhub_db::models::user::{CreateUser, User};
use bookhub_db::repositories::{BookRepo, UserRepo};
use common::{auth_token, body_json, build_test_app_with_pool, expect_failure, send, MockImages};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a user directly in the database.
async fn create_test_user(pool: &PgPool, username: &str) -> User {
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        password_hash: hash_password("test_password_123").expect("hashing should succeed"),
        profile_image: format!("https://api.dicebear.com/7.x/avataaars/svg?seed={username}"),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Insert a book directly in the database, optionally with a stored
/// deletable public id.
async fn create_test_book(
    pool: &PgPool,
    owner: &User,
    title: &str,
    public_id: Option<&str>,
) -> Book {
    let input = CreateBook {
        title: title.to_string(),
        caption: format!("caption for {title}"),
        rating: 4,
        image_url: format!(
            "https://res.cloudinary.com/test/image/upload/v1/bookhub/{title}.jpg"
        ),
        image_public_id: public_id.map(str::to_string),
        user_id: owner.id,
    };
    BookRepo::create(pool, &input)
        .await
        .expect("book creation should succeed")
}

// ---------------------------------------------------------------------------
// Ownership enforcement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn delete_by_non_owner_is_rejected_and_changes_nothing(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    let intruder = create_test_user(&pool, "intruder").await;
    let book = create_test_book(&pool, &owner, "mine", Some("bookhub/mine")).await;

    let images = Arc::new(MockImages::default());
    let app = build_test_app_with_pool(pool.clone(), Arc::clone(&images));

    let token = auth_token(intruder.id);
    let uri = format!("/api/books/{}", book.id);
    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    let json = expect_failure(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["message"], "You can only delete your own books");

    // Neither the row nor the remote image was touched.
    assert!(BookRepo::find_by_id(&pool, book.id)
        .await
        .expect("lookup should succeed")
        .is_some());
    assert!(images.deleted.lock().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_by_non_owner_is_rejected(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    let intruder = create_test_user(&pool, "intruder").await;
    let book = create_test_book(&pool, &owner, "mine", None).await;

    let app = build_test_app_with_pool(pool.clone(), Arc::new(MockImages::default()));

    let token = auth_token(intruder.id);
    let uri = format!("/api/books/{}", book.id);
    let response = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "title": "stolen" })),
    )
    .await;
    expect_failure(response, StatusCode::UNAUTHORIZED).await;

    let unchanged = BookRepo::find_by_id(&pool, book.id)
        .await
        .expect("lookup should succeed")
        .expect("book should still exist");
    assert_eq!(unchanged.title, "mine");
}

// ---------------------------------------------------------------------------
// Delete with best-effort remote cleanup
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn owner_delete_removes_row_and_remote_image(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    let book = create_test_book(&pool, &owner, "gone", Some("bookhub/gone")).await;

    let images = Arc::new(MockImages::default());
    let app = build_test_app_with_pool(pool.clone(), Arc::clone(&images));

    let token = auth_token(owner.id);
    let uri = format!("/api/books/{}", book.id);
    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Book deleted successfully");

    assert!(BookRepo::find_by_id(&pool, book.id)
        .await
        .expect("lookup should succeed")
        .is_none());
    // The stored public id was used for the remote delete.
    assert_eq!(
        images.deleted.lock().unwrap().as_slice(),
        ["bookhub/gone"]
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn owner_delete_succeeds_even_when_remote_cleanup_fails(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    let book = create_test_book(&pool, &owner, "stubborn", Some("bookhub/stubborn")).await;

    let images = Arc::new(MockImages::default());
    images.fail_delete.store(true, Ordering::SeqCst);
    let app = build_test_app_with_pool(pool.clone(), Arc::clone(&images));

    let token = auth_token(owner.id);
    let uri = format!("/api/books/{}", book.id);
    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(
        json["message"],
        "Book deleted successfully (remote image cleanup failed)"
    );

    // The row removal is the primary operation and proceeded regardless.
    assert!(BookRepo::find_by_id(&pool, book.id)
        .await
        .expect("lookup should succeed")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_derives_public_id_when_none_is_stored(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    // Row persisted from a bare delivery URL, no stored public id.
    let book = create_test_book(&pool, &owner, "derived", None).await;

    let images = Arc::new(MockImages::default());
    let app = build_test_app_with_pool(pool.clone(), Arc::clone(&images));

    let token = auth_token(owner.id);
    let uri = format!("/api/books/{}", book.id);
    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        images.deleted.lock().unwrap().as_slice(),
        ["bookhub/derived"]
    );
}

// ---------------------------------------------------------------------------
// Partial update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn partial_update_changes_only_supplied_fields(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    let book = create_test_book(&pool, &owner, "original", Some("bookhub/original")).await;

    let app = build_test_app_with_pool(pool.clone(), Arc::new(MockImages::default()));

    let token = auth_token(owner.id);
    let uri = format!("/api/books/{}", book.id);
    let response = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "title": "renamed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["book"]["title"], "renamed");
    assert_eq!(json["book"]["caption"], "caption for original");
    assert_eq!(json["book"]["rating"], 4);
    assert_eq!(
        json["book"]["image"],
        "https://res.cloudinary.com/test/image/upload/v1/bookhub/original.jpg"
    );

    // The stored public id survived the scalar-only update.
    let row = BookRepo::find_by_id(&pool, book.id)
        .await
        .expect("lookup should succeed")
        .expect("book should still exist");
    assert_eq!(row.image_public_id.as_deref(), Some("bookhub/original"));
}

// ---------------------------------------------------------------------------
// Listing order
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn owner_listing_is_newest_first(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    let other = create_test_user(&pool, "other").await;

    let b1 = create_test_book(&pool, &owner, "first", None).await;
    let b2 = create_test_book(&pool, &owner, "second", None).await;
    let b3 = create_test_book(&pool, &owner, "third", None).await;
    // Another user's book must not leak into the listing.
    create_test_book(&pool, &other, "noise", None).await;

    let app = build_test_app_with_pool(pool, Arc::new(MockImages::default()));

    let token = auth_token(owner.id);
    let response = send(&app, Method::GET, "/api/books/user-books", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let ids: Vec<i64> = json
        .as_array()
        .expect("response body should be an array")
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [b3.id, b2.id, b1.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn feed_pages_slice_the_newest_first_order(pool: PgPool) {
    let owner = create_test_user(&pool, "owner").await;
    let mut ids = Vec::new();
    for i in 0..12 {
        let book = create_test_book(&pool, &owner, &format!("book{i}"), None).await;
        ids.push(book.id);
    }
    ids.reverse(); // newest first

    let app = build_test_app_with_pool(pool, Arc::new(MockImages::default()));
    let token = auth_token(owner.id);

    let response = send(&app, Method::GET, "/api/books/?page=3&limit=5", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["currentPage"], 3);
    assert_eq!(json["totalBooks"], 12);
    assert_eq!(json["totalPages"], 3);

    let page_ids: Vec<i64> = json["books"]
        .as_array()
        .expect("books should be an array")
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    assert_eq!(page_ids, &ids[10..]);
}
