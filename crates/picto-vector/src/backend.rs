//! Vector index backend trait and factory.
//!
//! A backend receives every [`VectorEntry`] of a build and persists them as
//! one index artifact. Builds are whole rebuilds, so backends never update
//! or delete entries.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::flat::FlatIndexBackend;
use crate::types::{VectorConfig, VectorEntry};
use picto_core::{Error, Result};

/// Trait for index storage strategies.
#[async_trait]
pub trait VectorIndexBackend: Send + Sync {
    /// Add entries to the index being built.
    ///
    /// # Errors
    ///
    /// Fails if an entry's vector does not have the index dimension.
    async fn add(&mut self, entries: Vec<VectorEntry>) -> Result<()>;

    /// Write the index artifact, replacing any previous one.
    async fn persist(&mut self) -> Result<PathBuf>;

    /// Number of entries added so far.
    fn len(&self) -> usize;

    /// Whether no entries have been added.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The vector dimension of this index.
    fn dimension(&self) -> usize;

    /// Path of the artifact written by [`persist`](Self::persist).
    fn artifact_path(&self) -> &Path;

    /// The backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Reject entries whose vector dimension differs from the index dimension.
pub fn check_dimensions(entries: &[VectorEntry], dimension: usize) -> Result<()> {
    match entries.iter().find(|e| e.dimension() != dimension) {
        Some(entry) => Err(Error::validation(format!(
            "Vector for '{}' has dimension {}, index expects {dimension}",
            entry.id,
            entry.dimension()
        ))),
        None => Ok(()),
    }
}

/// Where the configured backend writes its artifact inside `output_dir`.
pub fn index_artifact_path(config: &VectorConfig, output_dir: &Path) -> Result<PathBuf> {
    match config.backend.as_str() {
        "flat" => Ok(output_dir.join(crate::flat::FLAT_INDEX_FILE)),
        "lancedb" => Ok(output_dir.join(LANCEDB_DIR)),
        other => Err(unknown_backend(other)),
    }
}

/// Directory name of the LanceDB store inside the output directory.
pub const LANCEDB_DIR: &str = "lancedb";

fn unknown_backend(name: &str) -> Error {
    Error::config(format!(
        "Unknown vector backend: '{name}'. Supported: flat, lancedb"
    ))
}

/// Create the index backend named by the configuration.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unknown backend or one whose feature is
/// not compiled in.
pub fn create_index_backend(
    config: &VectorConfig,
    dimension: usize,
    output_dir: &Path,
) -> Result<Box<dyn VectorIndexBackend>> {
    let path = index_artifact_path(config, output_dir)?;
    match config.backend.as_str() {
        "flat" => Ok(Box::new(FlatIndexBackend::new(path, dimension))),
        #[cfg(feature = "vector-lancedb")]
        "lancedb" => Ok(Box::new(crate::lancedb::LancedbBackend::new(
            path,
            &config.collection,
            dimension,
            config.insert_batch_size,
        ))),
        #[cfg(not(feature = "vector-lancedb"))]
        "lancedb" => Err(Error::config(
            "Vector backend 'lancedb' requires the vector-lancedb feature",
        )),
        other => Err(unknown_backend(other)),
    }
}

// ============================================================================
// Tests
// ============================================================================
