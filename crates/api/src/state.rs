use std::sync::Arc;

use bookhub_core::upload::SessionStore;
use bookhub_images::ImageIngest;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: bookhub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// In-flight chunked-upload sessions (process-local).
    pub uploads: Arc<SessionStore>,
    /// Image ingestion client (Cloudinary in production, scripted in tests).
    pub images: Arc<dyn ImageIngest>,
}
