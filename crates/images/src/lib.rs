//! Image ingestion client for the BookHub backend.
//!
//! Book cover images live on an external Cloudinary-style host. This crate
//! defines the [`ImageIngest`] seam the API depends on, plus the concrete
//! [`CloudinaryClient`] that uploads a complete data-URI payload (applying
//! a size/quality transformation) and best-effort deletes by public id.

pub mod client;

pub use client::{CloudinaryClient, CloudinaryConfig, ImageIngest, IngestError, StoredImage};
