//! Pipeline orchestration: stage 1, stage 2, or both in sequence.
//!
//! Providers are passed in rather than built here, so the same code runs
//! against Gemini and fastembed in production and against the mock
//! providers in tests.

use picto_core::traits::{path_kind, ConfigProvider};
use picto_core::util::files::{scan_images, ScanOptions};
use picto_core::{Error, Result};
use picto_enrich::{
    EnrichmentClient, EnrichmentProvider, EnrichmentReport, EnrichmentRunner, LedgerStore,
};
use picto_vector::{EmbeddingProvider, VectorIndexBuilder, VectorIndexStats};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PictoConfig;

/// Resolved locations for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePaths {
    /// Directory holding the source images.
    pub images: PathBuf,
    /// The raw enrichment ledger.
    pub ledger: PathBuf,
    /// Directory receiving the stage 2 artifacts.
    pub output: PathBuf,
}

impl StagePaths {
    /// Paths from the configuration.
    pub fn from_config(config: &PictoConfig) -> Result<Self> {
        Ok(Self {
            images: config.content_path(path_kind::IMAGES)?,
            ledger: config.content_path(path_kind::LEDGER)?,
            output: config.content_path(path_kind::OUTPUT)?,
        })
    }

    /// Replace the image directory when `images` is set.
    pub fn with_images(mut self, images: Option<PathBuf>) -> Self {
        if let Some(images) = images {
            self.images = images;
        }
        self
    }

    /// Replace the ledger path when `ledger` is set.
    pub fn with_ledger(mut self, ledger: Option<PathBuf>) -> Self {
        if let Some(ledger) = ledger {
            self.ledger = ledger;
        }
        self
    }

    /// Replace the output directory when `output` is set.
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        if let Some(output) = output {
            self.output = output;
        }
        self
    }
}

/// Outcome of `run`: both stage reports.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Stage 1 report.
    pub enrichment: EnrichmentReport,
    /// Stage 2 statistics.
    pub index: VectorIndexStats,
}

/// Stage 1: scan the image directory and enrich every image without a
/// ledger record.
///
/// # Errors
///
/// Fails with [`Error::NotFound`] when the image directory is missing and
/// with [`Error::Config`] when no model can be selected. Per-image failures
/// are reported, not returned.
pub async fn run_enrich(
    config: &PictoConfig,
    provider: Arc<dyn EnrichmentProvider>,
    paths: &StagePaths,
    force: bool,
) -> Result<EnrichmentReport> {
    let options = ScanOptions::images().with_extensions(config.enrich.image_extensions.as_slice());
    let images = scan_images(&paths.images, &options).await?;
    log::info!(
        "Found {} images in {}",
        images.len(),
        paths.images.display()
    );

    let client = EnrichmentClient::new(provider, &config.enrich);
    let mut runner = EnrichmentRunner::new(client, &config.enrich).with_force(force);
    runner.run(&images, &LedgerStore::new(&paths.ledger)).await
}

/// Stage 2: normalize the ledger and build the vector index.
///
/// # Errors
///
/// Fails with [`Error::NotFound`] when the ledger file does not exist.
pub async fn run_vectorize(
    config: &PictoConfig,
    provider: Arc<dyn EmbeddingProvider>,
    paths: &StagePaths,
    force: bool,
) -> Result<VectorIndexStats> {
    if !paths.ledger.exists() {
        return Err(Error::not_found(format!(
            "Ledger file not found: {}",
            paths.ledger.display()
        )));
    }
    build_index(config, provider, paths, force).await
}

/// Both stages; the ledger written by stage 1 feeds stage 2.
///
/// An enrichment run that leaves no ledger on disk (for example an empty
/// image directory) still produces an empty index.
pub async fn run_all(
    config: &PictoConfig,
    enrichment: Arc<dyn EnrichmentProvider>,
    embedding: Arc<dyn EmbeddingProvider>,
    paths: &StagePaths,
    force: bool,
) -> Result<RunSummary> {
    log::info!("Stage 1: enrichment");
    let enrichment = run_enrich(config, enrichment, paths, force).await?;

    log::info!("Stage 2: vectorization");
    let index = build_index(config, embedding, paths, force).await?;

    Ok(RunSummary { enrichment, index })
}

async fn build_index(
    config: &PictoConfig,
    provider: Arc<dyn EmbeddingProvider>,
    paths: &StagePaths,
    force: bool,
) -> Result<VectorIndexStats> {
    let ledger = LedgerStore::new(&paths.ledger).load()?;
    log::info!(
        "Loaded {} ledger records from {}",
        ledger.len(),
        paths.ledger.display()
    );
    VectorIndexBuilder::new(provider, config.vector.clone())
        .with_force(force)
        .build_from_ledger(&ledger, &paths.output)
        .await
}
