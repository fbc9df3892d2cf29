use bookhub_images::CloudinaryConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret and Cloudinary credentials have
/// defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `90`; chunked-upload
    /// completion requests wait on the image host).
    pub request_timeout_secs: u64,
    /// Idle TTL for in-flight upload sessions in seconds (default: `600`).
    pub upload_session_ttl_secs: u64,
    /// Interval between upload-session eviction sweeps (default: `60`).
    pub upload_sweep_interval_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default   |
    /// |------------------------------|-----------|
    /// | `HOST`                       | `0.0.0.0` |
    /// | `PORT`                       | `3000`    |
    /// | `CORS_ORIGINS`               | `http://localhost:8081` |
    /// | `REQUEST_TIMEOUT_SECS`       | `90`      |
    /// | `UPLOAD_SESSION_TTL_SECS`    | `600`     |
    /// | `UPLOAD_SWEEP_INTERVAL_SECS` | `60`      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8081".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "90".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let upload_session_ttl_secs: u64 = std::env::var("UPLOAD_SESSION_TTL_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("UPLOAD_SESSION_TTL_SECS must be a valid u64");

        let upload_sweep_interval_secs: u64 = std::env::var("UPLOAD_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("UPLOAD_SWEEP_INTERVAL_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            upload_session_ttl_secs,
            upload_sweep_interval_secs,
            jwt,
        }
    }
}

/// Load the Cloudinary configuration from environment variables.
///
/// `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, and
/// `CLOUDINARY_API_SECRET` are required; `CLOUDINARY_FOLDER` defaults to
/// `bookhub`.
///
/// # Panics
///
/// Panics when a required variable is missing -- the server must not come
/// up without a working image host.
pub fn cloudinary_config_from_env() -> CloudinaryConfig {
    let cloud_name = std::env::var("CLOUDINARY_CLOUD_NAME")
        .expect("CLOUDINARY_CLOUD_NAME must be set in the environment");
    let api_key = std::env::var("CLOUDINARY_API_KEY")
        .expect("CLOUDINARY_API_KEY must be set in the environment");
    let api_secret = std::env::var("CLOUDINARY_API_SECRET")
        .expect("CLOUDINARY_API_SECRET must be set in the environment");
    let folder = std::env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "bookhub".into());

    CloudinaryConfig::new(cloud_name, api_key, api_secret, folder)
}
