//! Handler for the chunked cover-image upload endpoint.
//!
//! Clients send base64 image chunks across separate requests, correlated
//! by `uploadId`. Until the last chunk arrives the response reports
//! progress; the completing request reassembles the payload, hands it to
//! the image host, and returns the permanent URL. The session is gone by
//! the time ingestion runs, so a failed ingestion reports 500 and the
//! client starts the upload over.

use axum::extract::State;
use axum::Json;
use bookhub_core::error::CoreError;
use bookhub_core::upload::{ensure_data_uri, ChunkStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /api/books/upload-image`.
///
/// Fields are optional so presence is checked here and reported through
/// the standard envelope rather than as a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadRequest {
    pub image_chunk: Option<String>,
    pub chunk_index: Option<u32>,
    pub total_chunks: Option<u32>,
    pub upload_id: Option<String>,
}

/// POST /api/books/upload-image
pub async fn upload_image(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(input): Json<ChunkUploadRequest>,
) -> AppResult<Json<Value>> {
    let (Some(chunk), Some(index), Some(total), Some(upload_id)) = (
        input.image_chunk,
        input.chunk_index,
        input.total_chunks,
        input.upload_id,
    ) else {
        return Err(CoreError::Validation(
            "Missing required chunk upload parameters".into(),
        )
        .into());
    };

    match state.uploads.submit(&upload_id, index, total, &chunk).await? {
        ChunkStatus::Pending { received, total } => Ok(Json(json!({
            "success": true,
            "message": format!("Chunk {}/{} received", index + 1, total),
            "chunksReceived": received,
            "totalChunks": total,
        }))),
        ChunkStatus::Complete { payload } => {
            // Heuristic fallback: a payload without a data-URI header is
            // assumed to be base64 JPEG.
            let data_uri = ensure_data_uri(payload);

            tracing::info!(upload_id = %upload_id, "upload complete, ingesting image");
            let stored = state.images.ingest(&data_uri).await?;

            Ok(Json(json!({
                "success": true,
                "message": "Image uploaded successfully",
                "imageUrl": stored.url,
                "publicId": stored.public_id,
            })))
        }
    }
}
