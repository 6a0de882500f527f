//! Stage 1: enrich every new image and grow the ledger.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::client::EnrichmentClient;
use crate::config::EnrichConfig;
use crate::ledger::{LedgerStore, RawEnrichmentRecord};
use crate::provider::ImagePayload;
use picto_core::{source_id_from_path, write_atomic, Error, Result};

/// An image that could not be enriched in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentFailure {
    /// File stem of the image (may be empty if it could not be derived).
    pub source_id: String,
    /// Image file on disk.
    pub image_path: PathBuf,
    /// Error kind, e.g. `api` or `malformed_response`.
    pub kind: String,
    /// Human-readable error.
    pub message: String,
    /// Raw model output, for malformed responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl EnrichmentFailure {
    fn from_error(source_id: &str, image_path: &Path, err: &Error) -> Self {
        Self {
            source_id: source_id.to_string(),
            image_path: image_path.to_path_buf(),
            kind: err.kind().to_string(),
            message: err.to_string(),
            raw_response: err.raw_response().map(String::from),
        }
    }
}

/// Outcome of one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    /// Images found by the scanner.
    pub total_images: usize,
    /// Images enriched and written to the ledger.
    pub processed: usize,
    /// Images already present in the ledger.
    pub skipped: usize,
    /// Images that failed.
    pub failures: Vec<EnrichmentFailure>,
    /// Ledger records after the run.
    pub ledger_size: usize,
    /// Model used, if any call was made.
    pub model: Option<String>,
}

impl EnrichmentReport {
    /// Number of failed images.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Log a one-line summary.
    pub fn log_summary(&self) {
        log::info!(
            "Enrichment finished: {} images, {} processed, {} skipped, {} failed, {} ledger records",
            self.total_images,
            self.processed,
            self.skipped,
            self.failed(),
            self.ledger_size
        );
    }
}

/// Path of the failures report written next to a ledger.
///
/// `data/ledger.json` reports to `data/ledger.failures.json`.
pub fn failures_path(ledger_path: &Path) -> PathBuf {
    ledger_path.with_extension("failures.json")
}

/// Runs stage 1 over a list of images.
#[derive(Debug)]
pub struct EnrichmentRunner {
    client: EnrichmentClient,
    image_path_prefix: String,
    force: bool,
}

impl EnrichmentRunner {
    /// Creates a runner.
    pub fn new(client: EnrichmentClient, config: &EnrichConfig) -> Self {
        Self {
            client,
            image_path_prefix: config.image_path_prefix.trim_end_matches('/').to_string(),
            force: false,
        }
    }

    /// Re-enrich images that already have a ledger record.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// The client, for inspecting the selected model.
    pub fn client(&self) -> &EnrichmentClient {
        &self.client
    }

    fn served_path(&self, image: &Path) -> String {
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.image_path_prefix.is_empty() {
            file_name
        } else {
            format!("{}/{file_name}", self.image_path_prefix)
        }
    }

    /// Enrich every image without a ledger record and persist after each one.
    ///
    /// Per-image failures are collected in the report, including images whose
    /// file stem collides with one queued earlier. Failures to load or
    /// write the ledger, or to select a model, abort the run; records
    /// persisted before that point remain on disk.
    pub async fn run(&mut self, images: &[PathBuf], store: &LedgerStore) -> Result<EnrichmentReport> {
        let mut ledger = store.load()?;
        let mut report = EnrichmentReport {
            total_images: images.len(),
            ..Default::default()
        };

        let mut pending = Vec::new();
        let mut queued = HashSet::new();
        for image in images {
            match source_id_from_path(image) {
                Some(source_id) if ledger.contains(&source_id) && !self.force => {
                    log::debug!("Skipping '{source_id}', already enriched");
                    report.skipped += 1;
                }
                Some(source_id) if queued.contains(&source_id) => {
                    let err = Error::validation(format!(
                        "{} maps to source id '{source_id}', already taken by another image",
                        image.display()
                    ));
                    log::warn!("{err}");
                    report
                        .failures
                        .push(EnrichmentFailure::from_error(&source_id, image, &err));
                }
                Some(source_id) => {
                    queued.insert(source_id.clone());
                    pending.push((source_id, image));
                }
                None => {
                    let err = Error::validation(format!(
                        "cannot derive a source id from {}",
                        image.display()
                    ));
                    log::warn!("{err}");
                    report
                        .failures
                        .push(EnrichmentFailure::from_error("", image, &err));
                }
            }
        }

        if pending.is_empty() {
            log::info!("No new images to enrich");
        } else {
            report.model = Some(self.client.select_model().await?);
        }

        let total = pending.len();
        for (i, (source_id, image)) in pending.into_iter().enumerate() {
            log::info!("[{}/{total}] Enriching '{source_id}'", i + 1);

            let payload = match ImagePayload::from_path(image).await {
                Ok(payload) => payload,
                Err(e) => {
                    log::warn!("Cannot read image for '{source_id}': {e}");
                    report
                        .failures
                        .push(EnrichmentFailure::from_error(&source_id, image, &e));
                    continue;
                }
            };

            let added = self
                .client
                .enrich(&payload, &source_id)
                .await
                .and_then(|output| {
                    RawEnrichmentRecord::from_output(&source_id, self.served_path(image), &output)
                })
                .and_then(|record| {
                    if self.force {
                        ledger.replace(record);
                        Ok(())
                    } else {
                        ledger.append(record)
                    }
                });

            match added {
                Ok(()) => {
                    store.persist(&ledger)?;
                    report.processed += 1;
                }
                Err(e) if e.is_per_item() => {
                    log::warn!("Failed to enrich '{source_id}': {e}");
                    report
                        .failures
                        .push(EnrichmentFailure::from_error(&source_id, image, &e));
                }
                Err(e) => return Err(e),
            }
        }

        report.ledger_size = ledger.len();
        write_failures(store.path(), &report.failures)?;
        report.log_summary();
        Ok(report)
    }
}

/// Write the failures report, or remove a stale one when nothing failed.
fn write_failures(ledger_path: &Path, failures: &[EnrichmentFailure]) -> Result<()> {
    let path = failures_path(ledger_path);
    if failures.is_empty() {
        return match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io_with_path(e, &path)),
        };
    }
    let json = serde_json::to_vec_pretty(failures)?;
    write_atomic(&path, &json)?;
    log::warn!(
        "{} images failed, details in {}",
        failures.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEnrichmentProvider;
    use crate::retry::RetryPolicy;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn runner(mock: &MockEnrichmentProvider) -> EnrichmentRunner {
        let config = EnrichConfig::default();
        let client = EnrichmentClient::new(Arc::new(mock.clone()), &config).with_retry_policy(
            RetryPolicy::default()
                .with_initial_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(2)),
        );
        EnrichmentRunner::new(client, &config)
    }

    fn images(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.path().join(format!("{name}.png"));
                std::fs::write(&path, b"\x89PNG fake").unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_failures_path() {
        assert_eq!(
            failures_path(Path::new("data/ledger.json")),
            PathBuf::from("data/ledger.failures.json")
        );
    }

    #[tokio::test]
    async fn test_run_enriches_and_records_image_path() {
        let dir = tempdir().unwrap();
        let imgs = images(&dir, &["eten", "tanden poetsen"]);
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let mock = MockEnrichmentProvider::new();

        let report = runner(&mock).run(&imgs, &store).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.ledger_size, 2);
        assert_eq!(report.model.as_deref(), Some("gemini-1.5-flash-latest"));

        let ledger = store.load().unwrap();
        let record = ledger.get("tanden poetsen").unwrap();
        assert_eq!(record.image_path, "img/nl/tanden poetsen.png");
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let dir = tempdir().unwrap();
        let imgs = images(&dir, &["a", "b"]);
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let mock = MockEnrichmentProvider::new();

        runner(&mock).run(&imgs, &store).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let report = runner(&mock).run(&imgs, &store).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.list_calls(), 1);
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_run_records_failures_and_continues() {
        let dir = tempdir().unwrap();
        let imgs = images(&dir, &["a", "kapot", "z"]);
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let mock = MockEnrichmentProvider::new().with_response_for("kapot", "{\"tags\": 1}");

        let report = runner(&mock).run(&imgs, &store).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.failed(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.source_id, "kapot");
        assert_eq!(failure.kind, "malformed_response");
        assert_eq!(failure.raw_response.as_deref(), Some("{\"tags\": 1}"));
        assert!(!store.load().unwrap().contains("kapot"));

        let written: Vec<EnrichmentFailure> = serde_json::from_slice(
            &std::fs::read(failures_path(store.path())).unwrap(),
        )
        .unwrap();
        assert_eq!(written, report.failures);
    }

    #[tokio::test]
    async fn test_run_removes_stale_failures_report() {
        let dir = tempdir().unwrap();
        let imgs = images(&dir, &["a"]);
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        std::fs::write(failures_path(store.path()), "[]").unwrap();

        runner(&MockEnrichmentProvider::new())
            .run(&imgs, &store)
            .await
            .unwrap();
        assert!(!failures_path(store.path()).exists());
    }

    #[tokio::test]
    async fn test_run_force_replaces_in_place() {
        let dir = tempdir().unwrap();
        let imgs = images(&dir, &["a", "b"]);
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        runner(&MockEnrichmentProvider::new())
            .run(&imgs, &store)
            .await
            .unwrap();

        let mock = MockEnrichmentProvider::new()
            .with_response_for("a", MockEnrichmentProvider::valid_response("opnieuw"));
        let report = runner(&mock)
            .with_force(true)
            .run(&imgs, &store)
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        let ledger = store.load().unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.records()[0].source_id, "a");
        let description = ledger.get("a").unwrap().field("description").unwrap();
        assert!(description.as_str().unwrap().contains("opnieuw"));
    }

    #[tokio::test]
    async fn test_run_empty_input_yields_empty_report() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let mock = MockEnrichmentProvider::new();

        let report = runner(&mock).run(&[], &store).await.unwrap();

        assert_eq!(report, EnrichmentReport::default());
        assert_eq!(mock.list_calls(), 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_run_missing_image_is_a_failure() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let missing = vec![dir.path().join("weg.png")];

        let report = runner(&MockEnrichmentProvider::new())
            .run(&missing, &store)
            .await
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].source_id, "weg");
    }

    #[tokio::test]
    async fn test_run_without_models_is_fatal() {
        let dir = tempdir().unwrap();
        let imgs = images(&dir, &["a"]);
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let mock = MockEnrichmentProvider::new().with_models(vec![]);

        let err = runner(&mock).run(&imgs, &store).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_run_colliding_source_ids_continue() {
        let dir = tempdir().unwrap();
        let imgs: Vec<PathBuf> = ["eten.PNG", "eten.png", "zwemmen.png"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, b"\x89PNG fake").unwrap();
                path
            })
            .collect();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let mock = MockEnrichmentProvider::new();

        let report = runner(&mock).run(&imgs, &store).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.failed(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.source_id, "eten");
        assert_eq!(failure.kind, "validation");
        assert!(failure.message.contains("eten.png"));
        assert_eq!(mock.calls_for("eten"), 1);
        assert_eq!(mock.calls_for("zwemmen"), 1);

        let ids: Vec<_> = store
            .load()
            .unwrap()
            .iter()
            .map(|r| r.source_id.clone())
            .collect();
        assert_eq!(ids, vec!["eten", "zwemmen"]);
        assert!(failures_path(store.path()).exists());
    }
}
