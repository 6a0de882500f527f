//! Embedding provider trait, mock implementation and factory.
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: Deterministic fixed-dimension vectors for testing
//! - `FastEmbedProvider`: Local multilingual embedding via fastembed (requires
//!   `vector-fastembed` feature)

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::VectorConfig;
use picto_core::{Error, Result};

/// Trait for generating text embeddings.
///
/// Implementations wrap specific embedding libraries and provide a uniform
/// async interface. The dimension is fixed once the provider is loaded.
///
/// # Thread Safety
///
/// Implementations should handle internal synchronization (e.g., `Arc<Mutex<>>`)
/// for thread-unsafe underlying libraries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    ///
    /// The output has one vector per input, in input order. The default
    /// implementation calls `embed` for each text sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Check a batch result against the request: one vector per text, each of
/// the provider's dimension.
pub fn check_batch(vectors: &[Vec<f32>], expected: usize, dimension: usize) -> Result<()> {
    if vectors.len() != expected {
        return Err(Error::operation(format!(
            "Embedding batch returned {} vectors for {expected} texts",
            vectors.len()
        )));
    }
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimension) {
        return Err(Error::operation(format!(
            "Embedding {i} has dimension {}, expected {dimension}",
            v.len()
        )));
    }
    Ok(())
}

/// A mock embedding provider for testing.
///
/// Vector components are drawn from a blake3 hash of the text, so equal
/// texts get equal unit vectors and different texts get unrelated ones.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let mut bytes = vec![0u8; self.dimension * 4];
        blake3::Hasher::new()
            .update(text.as_bytes())
            .finalize_xof()
            .fill(&mut bytes);

        let mut embedding: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| {
                let n = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                (n as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.deterministic_embedding(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| self.deterministic_embedding(t))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Create the embedding provider named by the configuration.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unknown provider, a provider whose
/// feature is not compiled in, or a model that fails to load.
pub fn create_embedding_provider(config: &VectorConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => {
            if config.dimension == 0 {
                return Err(Error::config("Mock embedding provider needs a dimension > 0"));
            }
            Ok(Arc::new(MockEmbeddingProvider::new(config.dimension)))
        }
        #[cfg(feature = "vector-fastembed")]
        "fastembed" => Ok(Arc::new(crate::fastembed::FastEmbedProvider::new(
            &config.model,
            config.cache_path.as_deref(),
        )?)),
        #[cfg(not(feature = "vector-fastembed"))]
        "fastembed" => Err(Error::config(
            "Embedding provider 'fastembed' requires the vector-fastembed feature",
        )),
        other => Err(Error::config(format!(
            "Unknown embedding provider: '{other}'. Supported: fastembed, mock"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_creation() {
        let provider = MockEmbeddingProvider::new(384);
        assert_eq!(provider.dimension(), 384);
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_mock_embed_single() {
        let provider = MockEmbeddingProvider::new(8);
        let embedding = tokio_test::block_on(provider.embed("hello world")).unwrap();

        assert_eq!(embedding.len(), 8);

        // Verify unit-normalized
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_mock_embed_deterministic() {
        let provider = MockEmbeddingProvider::new(16);
        let e1 = provider.embed("same text").await.unwrap();
        let e2 = provider.embed("same text").await.unwrap();

        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn test_mock_embed_different_texts() {
        let provider = MockEmbeddingProvider::new(16);
        let e1 = provider.embed("text one").await.unwrap();
        let e2 = provider.embed("text two").await.unwrap();

        assert_ne!(e1, e2);
    }

    #[tokio::test]
    async fn test_mock_embed_batch_preserves_order() {
        let provider = MockEmbeddingProvider::new(8);
        let texts = vec!["hello", "world", "test"];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for (text, emb) in texts.iter().zip(&embeddings) {
            assert_eq!(emb, &provider.embed(text).await.unwrap());
        }
        check_batch(&embeddings, 3, 8).unwrap();
    }

    #[tokio::test]
    async fn test_mock_embed_batch_empty() {
        let provider = MockEmbeddingProvider::new(4);
        let texts: Vec<&str> = vec![];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert!(embeddings.is_empty());
    }

    #[test]
    fn test_check_batch_rejects_mismatch() {
        let vectors = vec![vec![0.0; 4], vec![0.0; 3]];
        assert!(check_batch(&vectors, 3, 4).is_err());
        let err = check_batch(&vectors, 2, 4).unwrap_err();
        assert!(err.to_string().contains("dimension 3"));
    }

    #[test]
    fn test_create_mock_provider() {
        let config = VectorConfig {
            provider: "mock".to_string(),
            dimension: 12,
            ..Default::default()
        };
        let provider = create_embedding_provider(&config).unwrap();
        assert_eq!(provider.dimension(), 12);
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = VectorConfig {
            provider: "openai".to_string(),
            ..Default::default()
        };
        let err = create_embedding_provider(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn EmbeddingProvider) {}
    }
}
