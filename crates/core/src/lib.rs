//! Domain types and pure logic for the BookHub backend.
//!
//! Everything in this crate is I/O-free: the error taxonomy, pagination
//! math, and the in-memory chunked-upload session store live here so the
//! API and database crates can share them.

pub mod error;
pub mod pagination;
pub mod types;
pub mod upload;
