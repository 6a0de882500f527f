//! Build artifacts and freshness checking.
//!
//! Besides the index itself, a build writes:
//!
//! - `pictogram_data.json`: the normalized records, paired with vectors by `id`
//! - `rejected_records.json`: ledger records the normalizer excluded
//! - `index_metadata.json`: content hash and build parameters
//!
//! When the stored content hash, backend and model match the current build
//! and the index artifact still exists, the index is fresh and the rebuild
//! can be skipped.

use picto_core::{write_atomic, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{NormalizedPictogramRecord, RejectedRecord};

/// File name of the normalized metadata artifact.
pub const PICTOGRAM_DATA_FILE: &str = "pictogram_data.json";

/// File name of the rejected-records report.
pub const REJECTED_FILE: &str = "rejected_records.json";

/// File name of the index metadata.
pub const METADATA_FILE: &str = "index_metadata.json";

/// Metadata stored alongside a vector index for freshness checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Content hash at build time.
    pub content_hash: String,

    /// Number of records indexed.
    pub record_count: usize,

    /// Embedding dimension.
    pub embedding_dimension: usize,

    /// Build timestamp (RFC 3339).
    pub built_at: String,

    /// Embedding provider name.
    pub provider: String,

    /// Model name used for embeddings.
    pub model: String,

    /// Index backend name.
    pub backend: String,
}

/// Hash the normalized set and the texts embedded for it.
///
/// Any change to a record, its order or the text composition changes the
/// hash.
pub fn content_hash(records: &[NormalizedPictogramRecord], texts: &[String]) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&serde_json::to_vec(records)?);
    for text in texts {
        hasher.update(text.as_bytes());
        hasher.update(b"\n");
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Check if an existing vector index is fresh.
///
/// Compares the stored content hash with a freshly computed one.
/// Returns `true` if the metadata exists and the hashes match.
pub fn is_index_fresh(metadata_path: &Path, current_hash: &str) -> bool {
    match load_metadata(metadata_path) {
        Ok(metadata) => metadata.content_hash == current_hash,
        Err(_) => false,
    }
}

/// Whether a build with these parameters would reproduce the existing one.
pub fn is_build_fresh(
    output_dir: &Path,
    artifact_path: &Path,
    current_hash: &str,
    backend: &str,
    model: &str,
) -> bool {
    if !artifact_path.exists() || !output_dir.join(PICTOGRAM_DATA_FILE).exists() {
        return false;
    }
    match load_metadata(&output_dir.join(METADATA_FILE)) {
        Ok(metadata) => {
            metadata.content_hash == current_hash
                && metadata.backend == backend
                && metadata.model == model
        }
        Err(_) => false,
    }
}

/// Save index metadata to a JSON file.
pub fn save_metadata(metadata_path: &Path, metadata: &IndexMetadata) -> Result<()> {
    let json = serde_json::to_vec_pretty(metadata)?;
    write_atomic(metadata_path, &json)
}

/// Load index metadata from a JSON file.
pub fn load_metadata(metadata_path: &Path) -> Result<IndexMetadata> {
    let json = std::fs::read_to_string(metadata_path)
        .map_err(|e| Error::io_with_path(e, metadata_path))?;
    let metadata: IndexMetadata = serde_json::from_str(&json)?;
    Ok(metadata)
}

/// Write `pictogram_data.json` into `output_dir`.
pub fn save_pictogram_data(output_dir: &Path, records: &[NormalizedPictogramRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records)?;
    write_atomic(&output_dir.join(PICTOGRAM_DATA_FILE), &json)
}

/// Read `pictogram_data.json` from `output_dir`.
pub fn load_pictogram_data(output_dir: &Path) -> Result<Vec<NormalizedPictogramRecord>> {
    let path = output_dir.join(PICTOGRAM_DATA_FILE);
    let json = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
    Ok(serde_json::from_str(&json)?)
}

/// Write `rejected_records.json` into `output_dir`.
pub fn save_rejected(output_dir: &Path, rejected: &[RejectedRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(rejected)?;
    write_atomic(&output_dir.join(REJECTED_FILE), &json)
}

// ============================================================================
// Tests
// ============================================================================
