//! End-to-end pipeline tests against the mock providers.

use picto_cli::{run_all, run_enrich, run_vectorize, PictoConfig, StagePaths};
use picto_core::Error;
use picto_enrich::{failures_path, EnrichmentFailure, LedgerStore, MockEnrichmentProvider};
use picto_vector::{
    build_text, load_pictogram_data, FlatIndex, MockEmbeddingProvider, FLAT_INDEX_FILE,
    REJECTED_FILE,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const DIMENSION: usize = 16;

struct Fixture {
    dir: TempDir,
    config: PictoConfig,
    paths: StagePaths,
}

impl Fixture {
    fn new(images: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = PictoConfig {
            base_path: Some(dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        config.enrich.initial_delay_ms = 1;
        config.enrich.max_delay_ms = 2;
        config.vector.provider = "mock".to_string();
        config.vector.dimension = DIMENSION;
        config.vector.batch_size = 2;

        let paths = StagePaths::from_config(&config).unwrap();
        std::fs::create_dir_all(&paths.images).unwrap();
        let fixture = Self { dir, config, paths };
        for name in images {
            fixture.add_image(name);
        }
        fixture
    }

    fn add_image(&self, name: &str) {
        std::fs::write(self.paths.images.join(format!("{name}.png")), b"\x89PNG fake").unwrap();
    }

    fn ledger_ids(&self) -> Vec<String> {
        LedgerStore::new(&self.paths.ledger)
            .load()
            .unwrap()
            .iter()
            .map(|r| r.source_id.clone())
            .collect()
    }

    fn output(&self, file: &str) -> std::path::PathBuf {
        self.paths.output.join(file)
    }
}

fn embedder() -> Arc<MockEmbeddingProvider> {
    Arc::new(MockEmbeddingProvider::new(DIMENSION))
}

fn read_failures(ledger: &Path) -> Vec<EnrichmentFailure> {
    let json = std::fs::read_to_string(failures_path(ledger)).unwrap();
    serde_json::from_str(&json).unwrap()
}

// ============================================================================
// Stage 1
// ============================================================================

#[tokio::test]
async fn test_enrich_is_idempotent() {
    let fx = Fixture::new(&["eten", "slapen", "wandelen"]);
    let mock = MockEnrichmentProvider::new();

    let first = run_enrich(&fx.config, Arc::new(mock.clone()), &fx.paths, false)
        .await
        .unwrap();
    assert_eq!(first.processed, 3);
    let bytes = std::fs::read(&fx.paths.ledger).unwrap();

    let second = run_enrich(&fx.config, Arc::new(mock.clone()), &fx.paths, false)
        .await
        .unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(mock.call_count(), 3);
    assert_eq!(std::fs::read(&fx.paths.ledger).unwrap(), bytes);
}

#[tokio::test]
async fn test_enrich_resumes_after_failures() {
    let fx = Fixture::new(&["a_eten", "b_slapen", "c_wandelen"]);
    let failing = MockEnrichmentProvider::new().with_permanent_failure("b_slapen", "403 Forbidden");

    let report = run_enrich(&fx.config, Arc::new(failing), &fx.paths, false)
        .await
        .unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(fx.ledger_ids(), vec!["a_eten", "c_wandelen"]);
    assert_eq!(read_failures(&fx.paths.ledger)[0].source_id, "b_slapen");

    let healthy = MockEnrichmentProvider::new();
    let report = run_enrich(&fx.config, Arc::new(healthy.clone()), &fx.paths, false)
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(healthy.call_count(), 1);
    assert_eq!(fx.ledger_ids(), vec!["a_eten", "c_wandelen", "b_slapen"]);
    assert!(!failures_path(&fx.paths.ledger).exists());
}

#[tokio::test]
async fn test_enrich_retry_bound() {
    let fx = Fixture::new(&["a_zwemmen", "b_eten"]);
    let mock = MockEnrichmentProvider::new().with_transient_failures("a_zwemmen", 5);

    let report = run_enrich(&fx.config, Arc::new(mock.clone()), &fx.paths, false)
        .await
        .unwrap();

    assert_eq!(mock.calls_for("a_zwemmen"), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source_id, "a_zwemmen");
    assert_eq!(report.failures[0].kind, "api");

    // The run moves on once retries for the first image are exhausted.
    assert_eq!(mock.calls_for("b_eten"), 1);
    assert_eq!(report.processed, 1);
    assert_eq!(fx.ledger_ids(), vec!["b_eten"]);
}

#[tokio::test]
async fn test_enrich_records_malformed_output() {
    let fx = Fixture::new(&["eten"]);
    let mock = MockEnrichmentProvider::new().with_response_for("eten", "Sorry, I cannot help.");

    let report = run_enrich(&fx.config, Arc::new(mock), &fx.paths, false)
        .await
        .unwrap();

    assert_eq!(report.processed, 0);
    let failures = read_failures(&fx.paths.ledger);
    assert_eq!(failures[0].kind, "malformed_response");
    assert_eq!(failures[0].raw_response.as_deref(), Some("Sorry, I cannot help."));
}

#[tokio::test]
async fn test_enrich_empty_directory() {
    let fx = Fixture::new(&[]);
    let mock = MockEnrichmentProvider::new();

    let report = run_enrich(&fx.config, Arc::new(mock.clone()), &fx.paths, false)
        .await
        .unwrap();

    assert_eq!(report.total_images, 0);
    assert_eq!(report.processed, 0);
    assert!(report.failures.is_empty());
    assert_eq!(mock.call_count(), 0);
    assert_eq!(mock.list_calls(), 0);
}

#[tokio::test]
async fn test_enrich_missing_directory_is_not_found() {
    let fx = Fixture::new(&[]);
    let paths = fx.paths.clone().with_images(Some(fx.dir.path().join("nope")));

    let err = run_enrich(&fx.config, Arc::new(MockEnrichmentProvider::new()), &paths, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ============================================================================
// Stage 2
// ============================================================================

#[tokio::test]
async fn test_run_all_aligns_vectors_and_metadata() {
    let fx = Fixture::new(&["eten", "slapen", "tanden poetsen"]);

    let summary = run_all(
        &fx.config,
        Arc::new(MockEnrichmentProvider::new()),
        embedder(),
        &fx.paths,
        false,
    )
    .await
    .unwrap();
    assert_eq!(summary.enrichment.processed, 3);
    assert_eq!(summary.index.records_indexed, 3);
    assert_eq!(summary.index.records_rejected, 0);

    let data = load_pictogram_data(&fx.paths.output).unwrap();
    let index = FlatIndex::load(&fx.output(FLAT_INDEX_FILE)).unwrap();
    let ids: Vec<String> = data.iter().map(|r| r.id.clone()).collect();
    assert_eq!(index.ids(), ids.as_slice());
    assert_eq!(ids, vec!["eten", "slapen", "tanden poetsen"]);
    assert_eq!(data[2].image_path, "img/nl/tanden poetsen.png");
    assert_eq!(data[2].translations.en, "tanden poetsen (en)");

    // Each stored vector is the embedding of that record's text.
    let provider = MockEmbeddingProvider::new(DIMENSION);
    for record in &data {
        let expected = picto_vector::EmbeddingProvider::embed(&provider, &build_text(record))
            .await
            .unwrap();
        assert_eq!(index.search(&expected, 1).unwrap()[0].id, record.id);
    }
}

#[tokio::test]
async fn test_run_all_empty_directory_builds_empty_index() {
    let fx = Fixture::new(&[]);

    let summary = run_all(
        &fx.config,
        Arc::new(MockEnrichmentProvider::new()),
        embedder(),
        &fx.paths,
        false,
    )
    .await
    .unwrap();

    assert_eq!(summary.enrichment.total_images, 0);
    assert_eq!(summary.index.records_indexed, 0);
    assert!(FlatIndex::load(&fx.output(FLAT_INDEX_FILE)).unwrap().is_empty());
}

#[tokio::test]
async fn test_vectorize_rejects_empty_description() {
    let fx = Fixture::new(&[]);
    let ledger = json!([
        {
            "source_id": "eten",
            "image_path": "img/nl/eten.png",
            "translations": {"en": "eat", "fr": "manger", "de": "essen"},
            "tags": ["eten", "voedsel", "maaltijd", "honger", "bord"],
            "description": "Iemand eet een bord soep."
        },
        {
            "source_id": "slapen",
            "image_path": "img/nl/slapen.png",
            "translations": {"en": "sleep", "fr": "dormir", "de": "schlafen"},
            "tags": ["slapen", "bed", "nacht", "rust", "moe"],
            "description": ""
        }
    ]);
    std::fs::write(&fx.paths.ledger, serde_json::to_vec(&ledger).unwrap()).unwrap();

    let stats = run_vectorize(&fx.config, embedder(), &fx.paths, false)
        .await
        .unwrap();
    assert_eq!(stats.records_indexed, 1);
    assert_eq!(stats.records_rejected, 1);

    let data = load_pictogram_data(&fx.paths.output).unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].id, "eten");
    let rejected = std::fs::read_to_string(fx.output(REJECTED_FILE)).unwrap();
    assert!(rejected.contains("slapen"));
}

#[tokio::test]
async fn test_vectorize_accepts_legacy_ledger() {
    let fx = Fixture::new(&[]);
    let ledger = json!({
        "eten": {
            "image_path": "img/nl/eten.png",
            "translations": {"en": "eat", "fr": "manger", "de": "essen"},
            "tags": ["eten", "voedsel", "maaltijd", "honger", "bord"],
            "description": "Iemand eet een bord soep."
        }
    });
    std::fs::write(&fx.paths.ledger, serde_json::to_vec(&ledger).unwrap()).unwrap();

    let stats = run_vectorize(&fx.config, embedder(), &fx.paths, false)
        .await
        .unwrap();
    assert_eq!(stats.records_indexed, 1);
}

#[tokio::test]
async fn test_vectorize_is_deterministic() {
    let fx = Fixture::new(&["eten", "slapen", "wandelen", "zwemmen", "lezen"]);
    run_enrich(&fx.config, Arc::new(MockEnrichmentProvider::new()), &fx.paths, false)
        .await
        .unwrap();

    let other = fx.paths.clone().with_output(Some(fx.dir.path().join("second")));
    run_vectorize(&fx.config, embedder(), &fx.paths, false).await.unwrap();
    run_vectorize(&fx.config, embedder(), &other, false).await.unwrap();

    for file in [FLAT_INDEX_FILE, "pictogram_data.json"] {
        assert_eq!(
            std::fs::read(fx.output(file)).unwrap(),
            std::fs::read(other.output.join(file)).unwrap(),
            "{file} differs between builds"
        );
    }
}

#[tokio::test]
async fn test_vectorize_skips_fresh_index_unless_forced() {
    let fx = Fixture::new(&["eten", "slapen"]);
    run_enrich(&fx.config, Arc::new(MockEnrichmentProvider::new()), &fx.paths, false)
        .await
        .unwrap();

    let first = run_vectorize(&fx.config, embedder(), &fx.paths, false).await.unwrap();
    assert!(!first.from_cache);
    let second = run_vectorize(&fx.config, embedder(), &fx.paths, false).await.unwrap();
    assert!(second.from_cache);
    let forced = run_vectorize(&fx.config, embedder(), &fx.paths, true).await.unwrap();
    assert!(!forced.from_cache);

    fx.add_image("wandelen");
    run_enrich(&fx.config, Arc::new(MockEnrichmentProvider::new()), &fx.paths, false)
        .await
        .unwrap();
    let grown = run_vectorize(&fx.config, embedder(), &fx.paths, false).await.unwrap();
    assert!(!grown.from_cache);
    assert_eq!(grown.records_indexed, 3);
}

#[tokio::test]
async fn test_vectorize_missing_ledger_is_not_found() {
    let fx = Fixture::new(&[]);
    let err = run_vectorize(&fx.config, embedder(), &fx.paths, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
