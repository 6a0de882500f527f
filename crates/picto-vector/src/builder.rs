//! Stage 2 orchestration: normalized records to a persisted vector index.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::backend::{create_index_backend, index_artifact_path};
use crate::embedding::{check_batch, EmbeddingProvider};
use crate::extractor::{EmbeddingTextExtractor, PictogramTextExtractor};
use crate::normalizer::{normalize, NormalizationOutcome};
use crate::persistence::{
    content_hash, is_build_fresh, load_metadata, save_metadata, save_pictogram_data,
    save_rejected, IndexMetadata, METADATA_FILE,
};
use crate::types::{VectorConfig, VectorEntry, VectorIndexStats};
use picto_core::{Error, Result};
use picto_enrich::EnrichmentLedger;

/// Builds the vector index and its companion artifacts.
///
/// Every build is a whole rebuild from the normalized set; nothing is
/// updated in place. When the existing index already matches the input
/// the build is skipped unless forced.
pub struct VectorIndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    extractor: Box<dyn EmbeddingTextExtractor>,
    config: VectorConfig,
    force: bool,
}

impl VectorIndexBuilder {
    /// Create a builder using the default [`PictogramTextExtractor`].
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: VectorConfig) -> Self {
        Self {
            provider,
            extractor: Box::new(PictogramTextExtractor),
            config,
            force: false,
        }
    }

    /// Replace the text extractor.
    pub fn with_extractor(mut self, extractor: impl EmbeddingTextExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Rebuild even when the existing index is fresh.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Normalize the ledger and build from the result.
    pub async fn build_from_ledger(
        &self,
        ledger: &EnrichmentLedger,
        output_dir: &Path,
    ) -> Result<VectorIndexStats> {
        let outcome = normalize(ledger);
        self.build(&outcome, output_dir).await
    }

    /// Embed the normalized records and write the index, the metadata
    /// artifact, the rejected-records report and the index metadata.
    ///
    /// # Errors
    ///
    /// Fails if the provider returns the wrong number of vectors or a
    /// vector of the wrong dimension, or if any artifact cannot be written.
    pub async fn build(
        &self,
        outcome: &NormalizationOutcome,
        output_dir: &Path,
    ) -> Result<VectorIndexStats> {
        let start = Instant::now();
        let records = &outcome.records;

        std::fs::create_dir_all(output_dir).map_err(|e| Error::io_with_path(e, output_dir))?;
        save_rejected(output_dir, &outcome.rejected)?;

        let texts: Vec<String> = records
            .iter()
            .map(|r| self.extractor.extract_text(r))
            .collect();
        let hash = content_hash(records, &texts)?;
        let artifact = index_artifact_path(&self.config, output_dir)?;
        let model = self.provider.name().to_string();

        if !self.force
            && is_build_fresh(output_dir, &artifact, &hash, &self.config.backend, &model)
        {
            let metadata = load_metadata(&output_dir.join(METADATA_FILE))?;
            let stats = VectorIndexStats {
                records_indexed: metadata.record_count,
                records_rejected: outcome.rejected.len(),
                embedding_dimension: metadata.embedding_dimension,
                content_hash: hash,
                backend: metadata.backend,
                provider: metadata.provider,
                build_duration_ms: start.elapsed().as_millis() as u64,
                from_cache: true,
            };
            stats.log_summary();
            return Ok(stats);
        }

        if records.is_empty() {
            log::warn!("No valid records to vectorize; writing an empty index");
        }

        let dimension = self.provider.dimension();
        let batch_size = self.config.batch_size.max(1);
        let mut entries = Vec::with_capacity(records.len());

        for (batch_no, (record_chunk, text_chunk)) in records
            .chunks(batch_size)
            .zip(texts.chunks(batch_size))
            .enumerate()
        {
            let refs: Vec<&str> = text_chunk.iter().map(String::as_str).collect();
            let vectors = self.provider.embed_batch(&refs).await?;
            check_batch(&vectors, refs.len(), dimension)?;

            entries.extend(
                vectors
                    .into_iter()
                    .zip(record_chunk)
                    .map(|(vector, record)| VectorEntry::new(vector, record.clone())),
            );
            log::debug!(
                "Embedded batch {} ({}/{} records)",
                batch_no + 1,
                entries.len(),
                records.len()
            );
        }

        let mut backend = create_index_backend(&self.config, dimension, output_dir)?;
        let insert_batch_size = self.config.insert_batch_size.max(1);
        while !entries.is_empty() {
            let rest = entries.split_off(insert_batch_size.min(entries.len()));
            backend.add(std::mem::replace(&mut entries, rest)).await?;
        }
        if backend.len() != records.len() {
            return Err(Error::operation(format!(
                "Index holds {} vectors for {} records",
                backend.len(),
                records.len()
            )));
        }
        backend.persist().await?;

        save_pictogram_data(output_dir, records)?;

        let metadata = IndexMetadata {
            content_hash: hash.clone(),
            record_count: records.len(),
            embedding_dimension: dimension,
            built_at: chrono::Utc::now().to_rfc3339(),
            provider: self.config.provider.clone(),
            model,
            backend: backend.name().to_string(),
        };
        // Written last: its presence marks a complete build.
        save_metadata(&output_dir.join(METADATA_FILE), &metadata)?;

        let stats = VectorIndexStats {
            records_indexed: records.len(),
            records_rejected: outcome.rejected.len(),
            embedding_dimension: dimension,
            content_hash: hash,
            backend: metadata.backend,
            provider: metadata.provider,
            build_duration_ms: start.elapsed().as_millis() as u64,
            from_cache: false,
        };
        stats.log_summary();
        Ok(stats)
    }
}

impl std::fmt::Debug for VectorIndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndexBuilder")
            .field("provider", &self.provider.name())
            .field("extractor", &self.extractor.name())
            .field("config", &self.config)
            .field("force", &self.force)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
