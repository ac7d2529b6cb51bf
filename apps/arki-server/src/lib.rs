//! ARKI Server Library
//!
//! The binary in main.rs wires these modules together; tests drive them
//! directly.
//!
//! # Modules
//!
//! - `upload`: ingestion gate (validation, sanitized names, size ceiling)
//! - `pipeline`: flatten and restrict transformations
//! - `storage`: published artifacts and download lookup
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;
