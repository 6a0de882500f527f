//! Utility modules for file operations and identifiers.
//!
//! # Modules
//!
//! - [`files`]: Image discovery and durable writes
//! - [`ids`]: Source and record identifier derivation

pub mod files;
pub mod ids;
