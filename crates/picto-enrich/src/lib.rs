//! Stage 1 of the pictogram index pipeline: enrichment.
//!
//! Each pictogram image is sent, with its file stem as a hint, to a
//! multimodal model that answers with translations, Dutch tags and a Dutch
//! description. Every successful answer is appended to the enrichment
//! ledger and flushed to disk before the next image is processed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      picto-enrich                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EnrichmentProvider trait (transport)                       │
//! │  ├── GeminiProvider (generateContent over HTTP)             │
//! │  └── MockEnrichmentProvider (canned responses)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EnrichmentClient (model selection, retry, parsing)         │
//! │  RetryPolicy (exponential backoff, transient errors only)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LedgerStore / EnrichmentLedger (durable append log)        │
//! │  EnrichmentRunner (skip, enrich, persist, report)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use picto_enrich::{EnrichConfig, EnrichmentClient, EnrichmentRunner, GeminiProvider, LedgerStore};
//! use std::sync::Arc;
//!
//! let config = EnrichConfig::default();
//! let provider = Arc::new(GeminiProvider::from_config(&config)?);
//! let client = EnrichmentClient::new(provider, &config);
//! let mut runner = EnrichmentRunner::new(client, &config);
//!
//! let report = runner.run(&images, &LedgerStore::new("data/ledger.json")).await?;
//! println!("{} enriched, {} failed", report.processed, report.failed());
//! ```

pub mod client;
pub mod config;
pub mod gemini;
pub mod ledger;
pub mod mock;
pub mod prompt;
pub mod provider;
pub mod response;
pub mod retry;
pub mod runner;

// Re-exports — configuration
pub use config::EnrichConfig;

// Re-exports — transport
pub use gemini::GeminiProvider;
pub use mock::MockEnrichmentProvider;
pub use provider::{EnrichmentProvider, EnrichmentRequest, ImagePayload};

// Re-exports — client
pub use client::EnrichmentClient;
pub use response::{parse_response, EnrichmentOutput, Translations};
pub use retry::RetryPolicy;

// Re-exports — ledger and stage runner
pub use ledger::{EnrichmentLedger, LedgerStore, RawEnrichmentRecord};
pub use runner::{failures_path, EnrichmentFailure, EnrichmentReport, EnrichmentRunner};
