//! Flat (brute-force) vector index.
//!
//! Stores every vector contiguously and answers queries by exact cosine
//! similarity against all of them. The on-disk file is a bincode-encoded
//! [`FlatIndexFile`]; ids line up with `pictogram_data.json`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::backend::{check_dimensions, VectorIndexBackend};
use crate::types::VectorEntry;
use picto_core::{write_atomic, Error, Result};

/// File name of the flat index inside the output directory.
pub const FLAT_INDEX_FILE: &str = "pictograms.flat";

const FORMAT_VERSION: u32 = 1;

/// Serialized form of a flat index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndexFile {
    /// File format version.
    pub version: u32,
    /// Vector dimension.
    pub dimension: usize,
    /// Entry ids, in insertion order.
    pub ids: Vec<String>,
    /// Row-major vectors, `ids.len() * dimension` values.
    pub vectors: Vec<f32>,
}

/// Cosine similarity in `[-1, 1]`; zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

// ============================================================================
// Builder side
// ============================================================================

/// Backend that collects entries in memory and writes one flat file.
#[derive(Debug)]
pub struct FlatIndexBackend {
    path: PathBuf,
    dimension: usize,
    ids: Vec<String>,
    vectors: Vec<f32>,
}

impl FlatIndexBackend {
    /// Create an empty backend writing to `path`.
    pub fn new(path: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            path: path.into(),
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }
}

#[async_trait]
impl VectorIndexBackend for FlatIndexBackend {
    async fn add(&mut self, entries: Vec<VectorEntry>) -> Result<()> {
        check_dimensions(&entries, self.dimension)?;
        self.ids.reserve(entries.len());
        self.vectors.reserve(entries.len() * self.dimension);
        for entry in entries {
            self.ids.push(entry.id);
            self.vectors.extend_from_slice(&entry.vector);
        }
        Ok(())
    }

    async fn persist(&mut self) -> Result<PathBuf> {
        let file = FlatIndexFile {
            version: FORMAT_VERSION,
            dimension: self.dimension,
            ids: self.ids.clone(),
            vectors: self.vectors.clone(),
        };
        let bytes = bincode::serialize(&file)
            .map_err(|e| Error::operation(format!("Failed to encode flat index: {e}")))?;
        write_atomic(&self.path, &bytes)?;
        log::info!(
            "Flat index with {} vectors written to {}",
            self.ids.len(),
            self.path.display()
        );
        Ok(self.path.clone())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn artifact_path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        "flat"
    }
}

// ============================================================================
// Query side
// ============================================================================

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatSearchResult {
    /// Entry id.
    pub id: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// A loaded flat index, ready for exact search.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    ids: Vec<String>,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Load an index written by [`FlatIndexBackend`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::io_with_path(e, path))?;
        let file: FlatIndexFile = bincode::deserialize(&bytes).map_err(|e| {
            Error::operation(format!("Failed to decode flat index {}: {e}", path.display()))
        })?;

        if file.version != FORMAT_VERSION {
            return Err(Error::operation(format!(
                "Unsupported flat index version {} in {}",
                file.version,
                path.display()
            )));
        }
        let expected = file.ids.len().checked_mul(file.dimension).ok_or_else(|| {
            Error::operation(format!(
                "Flat index {} is inconsistent: {} ids of dimension {} overflow",
                path.display(),
                file.ids.len(),
                file.dimension
            ))
        })?;
        if file.vectors.len() != expected {
            return Err(Error::operation(format!(
                "Flat index {} is inconsistent: {} ids, {} values, dimension {}",
                path.display(),
                file.ids.len(),
                file.vectors.len(),
                file.dimension
            )));
        }

        Ok(Self {
            dimension: file.dimension,
            ids: file.ids,
            vectors: file.vectors,
        })
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Entry ids, in insertion order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// The vector stored for `id`.
    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        let row = self.ids.iter().position(|i| i == id)?;
        Some(self.row(row))
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    /// The `limit` most similar entries, best first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<FlatSearchResult>> {
        if query.len() != self.dimension {
            return Err(Error::validation(format!(
                "Query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|i| (i, cosine_similarity(query, self.row(i))))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(i, score)| FlatSearchResult {
                id: self.ids[i].clone(),
                score,
            })
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
