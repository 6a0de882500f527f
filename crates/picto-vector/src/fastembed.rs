//! FastEmbed embedding provider.
//!
//! Wraps the `fastembed` crate to generate embeddings locally with
//! multilingual sentence-embedding models, so Dutch pictogram text and
//! queries in other languages share one vector space.
//!
//! # Thread Safety
//!
//! `fastembed::TextEmbedding` needs exclusive access while embedding, so it
//! is wrapped in `Arc<Mutex<>>` and called from `tokio::task::spawn_blocking`.
//!
//! # Feature Gate
//!
//! This module requires the `vector-fastembed` feature.

use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use picto_core::{Error, Result};
use std::sync::{Arc, Mutex};

/// Map a model name string to a fastembed `EmbeddingModel` enum variant.
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "paraphrase-multilingual-minilm-l12-v2" | "ParaphraseMLMiniLML12V2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
        }
        "paraphrase-multilingual-mpnet-base-v2" | "ParaphraseMLMpnetBaseV2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMpnetBaseV2)
        }
        "multilingual-e5-small" | "MultilingualE5Small" => {
            Ok(fastembed::EmbeddingModel::MultilingualE5Small)
        }
        "multilingual-e5-base" | "MultilingualE5Base" => {
            Ok(fastembed::EmbeddingModel::MultilingualE5Base)
        }
        "multilingual-e5-large" | "MultilingualE5Large" => {
            Ok(fastembed::EmbeddingModel::MultilingualE5Large)
        }
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        other => Err(Error::config(format!(
            "Unknown embedding model: '{other}'. Supported: paraphrase-multilingual-minilm-l12-v2, \
             paraphrase-multilingual-mpnet-base-v2, multilingual-e5-small, multilingual-e5-base, \
             multilingual-e5-large, bge-small-en-v1.5"
        ))),
    }
}

/// FastEmbed-based embedding provider.
///
/// The model is downloaded on first use, loaded once and reused.
///
/// # Supported Models
///
/// | Name | Dimension |
/// |------|-----------|
/// | `paraphrase-multilingual-minilm-l12-v2` | 384 |
/// | `paraphrase-multilingual-mpnet-base-v2` | 768 |
/// | `multilingual-e5-small` | 384 |
/// | `multilingual-e5-base` | 768 |
/// | `multilingual-e5-large` | 1024 |
/// | `bge-small-en-v1.5` (English only) | 384 |
pub struct FastEmbedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Load the named model.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Model identifier (e.g., "paraphrase-multilingual-minilm-l12-v2")
    /// * `cache_path` - Optional directory for model file caching
    ///
    /// # Errors
    ///
    /// Any failure to resolve, download or initialize the model is an
    /// [`Error::Config`]: without a model there is nothing to vectorize.
    pub fn new(model_name: &str, cache_path: Option<&str>) -> Result<Self> {
        let model_enum = resolve_model(model_name)?;

        let mut init = fastembed::InitOptions::new(model_enum).with_show_download_progress(false);
        if let Some(path) = cache_path {
            init = init.with_cache_dir(std::path::PathBuf::from(path));
        }

        log::info!("Loading embedding model '{model_name}'...");
        let mut text_embedding = fastembed::TextEmbedding::try_new(init).map_err(|e| {
            Error::config(format!("Failed to load embedding model '{model_name}': {e}"))
        })?;

        // Probe dimension via a test embedding
        let probe = text_embedding
            .embed(vec!["dimensie test"], None)
            .map_err(|e| Error::config(format!("Failed to probe embedding dimension: {e}")))?;

        let dimension = probe
            .first()
            .map(|v| v.len())
            .filter(|&d| d > 0)
            .ok_or_else(|| Error::config("Embedding model returned an empty probe vector"))?;

        log::info!("Embedding model '{model_name}' loaded, dimension {dimension}");
        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            dimension,
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::operation("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model.clone();
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let batch_size = texts.len();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::operation(format!("Batch embedding failed: {e}")))
        })
        .await
        .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
