//! REST client for the Cloudinary image API.
//!
//! Wraps the upload and destroy endpoints using [`reqwest`]. Uploads apply
//! an 800x600 limit crop with automatic low quality so stored covers stay
//! small; requests are signed with a SHA-256 digest over the sorted
//! parameters plus the API secret.

use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Default upper bound on a single ingestion call.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Transformation applied to every uploaded cover image.
const UPLOAD_TRANSFORMATION: &str = "w_800,h_600,c_limit,q_auto:low";

/// A stored image as returned by the ingestion service.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Permanent delivery URL.
    pub url: String,
    /// Deletable identifier, persisted alongside the URL so later deletion
    /// never has to re-derive it from the URL string.
    pub public_id: String,
}

/// Errors from the image ingestion layer.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The HTTP request failed (network, DNS, TLS, timeout).
    #[error("image service request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The image service returned a non-2xx status code.
    #[error("image service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Capability interface the API core consumes for image hosting.
///
/// `delete` is best-effort from the caller's point of view: failures are
/// reported, and callers must not let them block their primary operation.
#[async_trait::async_trait]
pub trait ImageIngest: Send + Sync {
    /// Upload a complete `data:image/...;base64,` payload, applying the
    /// standard size/quality transformation.
    async fn ingest(&self, data_uri: &str) -> Result<StoredImage, IngestError>;

    /// Delete a previously ingested image by its public id.
    async fn delete(&self, public_id: &str) -> Result<(), IngestError>;

    /// Whether `url` points at an image this service produced.
    fn owns_url(&self, url: &str) -> bool;

    /// Recover the deletable public id from a delivery URL.
    ///
    /// Fallback for rows persisted without an explicit public id; prefer
    /// the stored id when present.
    fn public_id_from_url(&self, url: &str) -> Option<String>;
}

/// Configuration for [`CloudinaryClient`], loaded from the environment by
/// the API crate.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Folder every upload is placed under (becomes the public-id prefix).
    pub folder: String,
    /// Upper bound on a single upload/destroy call.
    pub timeout: Duration,
}

impl CloudinaryConfig {
    pub fn new(cloud_name: String, api_key: String, api_secret: String, folder: String) -> Self {
        Self {
            cloud_name,
            api_key,
            api_secret,
            folder,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for one Cloudinary account.
pub struct CloudinaryClient {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

/// Successful response from the upload endpoint.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: CloudinaryConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{action}",
            self.config.cloud_name
        )
    }

    /// Sign request parameters: SHA-256 over the `&`-joined, name-sorted
    /// `key=value` pairs with the API secret appended.
    ///
    /// `params` must already be sorted by key and exclude `file`,
    /// `api_key`, and the signature itself.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Extract the status and body from a non-2xx response.
    async fn api_error(response: reqwest::Response) -> IngestError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        IngestError::Api { status, body }
    }
}

#[async_trait::async_trait]
impl ImageIngest for CloudinaryClient {
    async fn ingest(&self, data_uri: &str) -> Result<StoredImage, IngestError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", &self.config.folder),
            ("timestamp", &timestamp),
            ("transformation", UPLOAD_TRANSFORMATION),
        ]);

        let form = [
            ("file", data_uri),
            ("folder", &self.config.folder),
            ("transformation", UPLOAD_TRANSFORMATION),
            ("timestamp", &timestamp),
            ("api_key", &self.config.api_key),
            ("signature", &signature),
        ];

        let response = self
            .client
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let uploaded: UploadResponse = response.json().await?;
        tracing::debug!(public_id = %uploaded.public_id, "image ingested");

        Ok(StoredImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), IngestError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let form = [
            ("public_id", public_id),
            ("timestamp", &timestamp),
            ("api_key", &self.config.api_key),
            ("signature", &signature),
        ];

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    fn owns_url(&self, url: &str) -> bool {
        url.contains("cloudinary.com")
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        public_id_from_delivery_url(url)
    }
}

/// Derive a public id from a Cloudinary delivery URL.
///
/// Delivery URLs look like
/// `https://res.cloudinary.com/<cloud>/image/upload/<transform>/v<n>/<folder>/<name>.<ext>`.
/// The public id is everything after the optional transformation and
/// version segments, with the file extension removed.
pub fn public_id_from_delivery_url(url: &str) -> Option<String> {
    let rest = url.split("/upload/").nth(1)?;
    let segments: Vec<&str> = rest
        .split('/')
        .skip_while(|s| is_transformation_segment(s) || is_version_segment(s))
        .collect();
    if segments.is_empty() {
        return None;
    }

    let mut public_id = segments.join("/");
    if let Some(dot) = public_id.rfind('.') {
        // Only the final segment can carry an extension.
        if !public_id[dot..].contains('/') {
            public_id.truncate(dot);
        }
    }
    if public_id.is_empty() {
        None
    } else {
        Some(public_id)
    }
}

/// A named transformation segment such as `w_800,h_600,c_limit`.
fn is_transformation_segment(segment: &str) -> bool {
    segment.contains(',')
}

/// A version segment such as `v1712345678`.
fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_public_id_with_folder() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1712345678/bookhub/abc123.jpg";
        assert_eq!(
            public_id_from_delivery_url(url).as_deref(),
            Some("bookhub/abc123")
        );
    }

    #[test]
    fn skips_transformation_segments() {
        let url =
            "https://res.cloudinary.com/demo/image/upload/w_800,h_600,c_limit/v17/bookhub/x.png";
        assert_eq!(
            public_id_from_delivery_url(url).as_deref(),
            Some("bookhub/x")
        );
    }

    #[test]
    fn handles_missing_version_segment() {
        let url = "https://res.cloudinary.com/demo/image/upload/bookhub/plain.webp";
        assert_eq!(
            public_id_from_delivery_url(url).as_deref(),
            Some("bookhub/plain")
        );
    }

    #[test]
    fn rejects_urls_without_an_upload_segment() {
        assert_eq!(public_id_from_delivery_url("https://example.com/a.jpg"), None);
    }

    #[test]
    fn version_like_folder_names_are_not_stripped() {
        // "version" folders contain non-digits and must survive.
        let url = "https://res.cloudinary.com/demo/image/upload/v2beta/cover.jpg";
        assert_eq!(
            public_id_from_delivery_url(url).as_deref(),
            Some("v2beta/cover")
        );
    }

    #[test]
    fn signature_is_stable_and_hex() {
        let config = CloudinaryConfig::new(
            "demo".into(),
            "key".into(),
            "secret".into(),
            "bookhub".into(),
        );
        let client = CloudinaryClient::new(config).unwrap();

        let a = client.sign(&[("public_id", "bookhub/x"), ("timestamp", "1700000000")]);
        let b = client.sign(&[("public_id", "bookhub/x"), ("timestamp", "1700000000")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
