//! Common types for the vectorization stage.
//!
//! These types are used across all index backends and embedding providers,
//! and are always available regardless of feature flags.

use picto_enrich::Translations;
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// Vectorization configuration.
///
/// Controls backend selection, embedding model, batching and caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Index backend: "flat" or "lancedb".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Embedding provider: "fastembed" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Embedding model name (e.g., "paraphrase-multilingual-minilm-l12-v2").
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding dimension for the mock provider (ignored by real models,
    /// whose dimension is probed at load time).
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Path to cache directory for embedding models.
    pub cache_path: Option<String>,

    /// Number of texts embedded per call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of entries written per backend insert.
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,

    /// Collection (table) name in the collection store.
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_backend() -> String {
    "flat".to_string()
}

fn default_provider() -> String {
    "fastembed".to_string()
}

fn default_model() -> String {
    "paraphrase-multilingual-minilm-l12-v2".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_batch_size() -> usize {
    64
}

fn default_insert_batch_size() -> usize {
    1000
}

fn default_collection() -> String {
    "pictograms".to_string()
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            provider: default_provider(),
            model: default_model(),
            dimension: default_dimension(),
            cache_path: None,
            batch_size: default_batch_size(),
            insert_batch_size: default_insert_batch_size(),
            collection: default_collection(),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A validated pictogram in the canonical schema.
///
/// This is the record written to `pictogram_data.json` and attached to
/// every vector as metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPictogramRecord {
    /// Stable identifier derived from the source id.
    pub id: String,

    /// Path the image is served from.
    pub image_path: String,

    /// Dutch concept name.
    pub concept_nl: String,

    /// Dutch description.
    pub description_nl: String,

    /// Dutch tags, in model order.
    pub tags_nl: Vec<String>,

    /// Dutch synonyms.
    #[serde(default)]
    pub synonyms_nl: Vec<String>,

    /// Categories.
    #[serde(default)]
    pub categories: Vec<String>,

    /// Concept translations.
    pub translations: Translations,
}

/// The text embedded for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingTextRecord {
    /// Record identifier.
    pub id: String,

    /// Cleaned, combined text.
    pub text: String,
}

impl EmbeddingTextRecord {
    /// Create a new text record.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A record with its computed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Record identifier.
    pub id: String,

    /// The embedding vector.
    pub vector: Vec<f32>,

    /// The normalized record.
    pub metadata: NormalizedPictogramRecord,
}

impl VectorEntry {
    /// Create a new entry.
    pub fn new(vector: Vec<f32>, metadata: NormalizedPictogramRecord) -> Self {
        Self {
            id: metadata.id.clone(),
            vector,
            metadata,
        }
    }

    /// The embedding dimension.
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A ledger record excluded from the normalized set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Source id of the rejected record.
    pub source_id: String,

    /// Why it was rejected.
    pub reason: String,
}

// ============================================================================
// Build output
// ============================================================================

/// Statistics from a vector index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexStats {
    /// Number of records indexed.
    pub records_indexed: usize,

    /// Number of ledger records rejected by the normalizer.
    pub records_rejected: usize,

    /// Embedding dimension used.
    pub embedding_dimension: usize,

    /// Content hash for freshness checking.
    pub content_hash: String,

    /// Backend that holds the index.
    pub backend: String,

    /// Embedding provider name.
    pub provider: String,

    /// Build duration in milliseconds.
    pub build_duration_ms: u64,

    /// Whether the existing index was fresh and kept.
    #[serde(default)]
    pub from_cache: bool,
}

impl VectorIndexStats {
    /// Log a one-line summary.
    pub fn log_summary(&self) {
        if self.from_cache {
            log::info!(
                "Vector index is fresh ({} records, {} backend), nothing rebuilt",
                self.records_indexed,
                self.backend
            );
        } else {
            log::info!(
                "Vectorization finished: {} indexed, {} rejected, dimension {}, {} backend, {} ms",
                self.records_indexed,
                self.records_rejected,
                self.embedding_dimension,
                self.backend,
                self.build_duration_ms
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: &str) -> NormalizedPictogramRecord {
        NormalizedPictogramRecord {
            id: id.to_string(),
            image_path: format!("img/nl/{id}.png"),
            concept_nl: id.to_string(),
            description_nl: "Een beschrijving.".to_string(),
            tags_nl: vec!["een".to_string(), "twee".to_string()],
            synonyms_nl: vec![],
            categories: vec![],
            translations: Translations {
                en: "en".to_string(),
                fr: "fr".to_string(),
                de: "de".to_string(),
            },
        }
    }

    #[test]
    fn test_vector_config_default() {
        let config = VectorConfig::default();
        assert_eq!(config.backend, "flat");
        assert_eq!(config.provider, "fastembed");
        assert_eq!(config.model, "paraphrase-multilingual-minilm-l12-v2");
        assert_eq!(config.dimension, 384);
        assert!(config.cache_path.is_none());
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.insert_batch_size, 1000);
        assert_eq!(config.collection, "pictograms");
    }

    #[test]
    fn test_vector_config_deserialization_with_defaults() {
        let json = r#"{"backend": "lancedb"}"#;
        let config: VectorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.backend, "lancedb");
        assert_eq!(config.provider, "fastembed");
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_normalized_record_field_names() {
        let json = serde_json::to_value(sample_record("eten")).unwrap();
        for key in [
            "id",
            "image_path",
            "concept_nl",
            "description_nl",
            "tags_nl",
            "synonyms_nl",
            "categories",
            "translations",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_vector_entry_takes_id_from_metadata() {
        let entry = VectorEntry::new(vec![0.1, 0.2, 0.3], sample_record("lezen"));
        assert_eq!(entry.id, "lezen");
        assert_eq!(entry.dimension(), 3);
    }

    #[test]
    fn test_index_stats_serialization() {
        let stats = VectorIndexStats {
            records_indexed: 100,
            records_rejected: 2,
            embedding_dimension: 384,
            content_hash: "abc123".to_string(),
            backend: "flat".to_string(),
            provider: "mock".to_string(),
            build_duration_ms: 1500,
            from_cache: false,
        };

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("100"));
        assert!(json.contains("384"));
        assert!(json.contains("abc123"));
    }
}
