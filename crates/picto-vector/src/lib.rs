//! Stage 2 of the pictogram index pipeline.
//!
//! Turns the enrichment ledger into a searchable vector index: records are
//! normalized into a fixed schema, composed into embedding text, embedded
//! in batches and written to an index backend together with the metadata
//! artifact that pairs each vector with its pictogram.
//!
//! # Features
//!
//! - `vector-lancedb`: LanceDB-based index storage and ANN search
//! - `vector-fastembed`: local multilingual embeddings via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      picto-vector                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  normalize (ledger -> NormalizedPictogramRecord + rejected) │
//! │  EmbeddingTextExtractor trait                               │
//! │  └── PictogramTextExtractor (concept. description. tags)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: vector-fastembed)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VectorIndexBackend trait                                   │
//! │  ├── FlatIndexBackend (always available)                    │
//! │  └── LancedbBackend (feature: vector-lancedb)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VectorIndexBuilder (batch embed + index orchestration)     │
//! │  Persistence (artifacts, content hash freshness checking)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use picto_enrich::LedgerStore;
//! use picto_vector::{create_embedding_provider, VectorConfig, VectorIndexBuilder};
//!
//! let config = VectorConfig::default();
//! let provider = create_embedding_provider(&config)?;
//! let ledger = LedgerStore::new("enriched_pictograms.json").load()?;
//!
//! let stats = VectorIndexBuilder::new(provider, config)
//!     .build_from_ledger(&ledger, "vector_db".as_ref())
//!     .await?;
//! println!("{} records indexed", stats.records_indexed);
//! ```

pub mod backend;
pub mod builder;
pub mod embedding;
pub mod extractor;
pub mod flat;
pub mod normalizer;
pub mod persistence;
pub mod types;

#[cfg(feature = "vector-fastembed")]
pub mod fastembed;

#[cfg(feature = "vector-lancedb")]
pub mod lancedb;

// Re-exports — core types
pub use types::{
    EmbeddingTextRecord, NormalizedPictogramRecord, RejectedRecord, VectorConfig, VectorEntry,
    VectorIndexStats,
};

// Re-exports — traits
pub use backend::VectorIndexBackend;
pub use embedding::EmbeddingProvider;
pub use extractor::EmbeddingTextExtractor;

// Re-exports — implementations
pub use backend::{create_index_backend, index_artifact_path, LANCEDB_DIR};
pub use builder::VectorIndexBuilder;
pub use embedding::{create_embedding_provider, MockEmbeddingProvider};
pub use extractor::{build_text, clean_text, PictogramTextExtractor};
pub use flat::{FlatIndex, FlatIndexBackend, FlatSearchResult, FLAT_INDEX_FILE};
pub use normalizer::{normalize, normalize_record, NormalizationOutcome};

// Re-exports — persistence
pub use persistence::{
    content_hash, is_build_fresh, is_index_fresh, load_metadata, load_pictogram_data,
    save_metadata, save_pictogram_data, save_rejected, IndexMetadata, METADATA_FILE,
    PICTOGRAM_DATA_FILE, REJECTED_FILE,
};

// Feature-gated re-exports
#[cfg(feature = "vector-fastembed")]
pub use fastembed::FastEmbedProvider;

#[cfg(feature = "vector-lancedb")]
pub use lancedb::{LancedbBackend, LancedbSearchResult};
