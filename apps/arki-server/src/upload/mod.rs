//! Ingestion Gate
//!
//! Accepts a single uploaded PDF:
//! - Extension allow-list (`pdf`)
//! - Byte-exact size ceiling, enforced while streaming
//! - Sanitized, deterministic storage name inside the ingestion directory
//!
//! Two uploads that sanitize to the same name share a path; the last writer
//! wins.

pub mod gate;
pub mod sanitize;
pub mod types;

pub use gate::IngestionGate;
pub use sanitize::{secure_filename, storage_name};
pub use types::*;
