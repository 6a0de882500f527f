//! Picto Core — shared errors, traits and utilities.
//!
//! This crate provides the foundational types used across all picto crates.
//! It has no internal picto dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`traits`]: Configuration abstraction
//! - [`util`]: Image discovery, durable writes and id derivation

pub mod error;
pub mod traits;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use traits::ConfigProvider;

// Convenience re-exports from util
pub use util::files::{scan_images, write_atomic, ScanOptions};
pub use util::ids::{concept_from_source_id, record_id, source_id_from_path};
