//! LanceDB collection-store backend.
//!
//! Writes the index as a LanceDB table, an embedded columnar vector store
//! built on Apache Arrow, for services that want ANN search and metadata
//! filtering instead of a flat scan.
//!
//! # Schema
//!
//! | Column | Type | Purpose |
//! |--------|------|---------|
//! | `id` | Utf8 | Record identifier |
//! | `concept_nl` | Utf8 | Dutch concept, for filtering and display |
//! | `image_path` | Utf8 | Served image path |
//! | `metadata` | Utf8 | JSON-serialized normalized record |
//! | `vector` | FixedSizeList<Float32> | Embedding vector |
//!
//! # Feature Gate
//!
//! This module requires the `vector-lancedb` feature.

use crate::backend::{check_dimensions, VectorIndexBackend};
use crate::types::{NormalizedPictogramRecord, VectorEntry};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use picto_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A search hit from the collection store.
#[derive(Debug, Clone)]
pub struct LancedbSearchResult {
    /// Record identifier.
    pub id: String,
    /// Similarity score in `(0, 1]`, derived from the L2 distance.
    pub score: f32,
    /// Raw distance from the query vector.
    pub distance: f32,
    /// The normalized record stored with the vector.
    pub metadata: Option<NormalizedPictogramRecord>,
}

/// LanceDB-backed index backend.
///
/// Entries are buffered by [`add`](VectorIndexBackend::add) and written by
/// [`persist`](VectorIndexBackend::persist), which replaces the table and
/// inserts in batches of `insert_batch_size`.
pub struct LancedbBackend {
    db_path: PathBuf,
    table_name: String,
    dimension: usize,
    insert_batch_size: usize,
    entries: Vec<VectorEntry>,
}

impl LancedbBackend {
    /// Create a backend for the database directory `db_path`.
    pub fn new(
        db_path: impl Into<PathBuf>,
        table_name: &str,
        dimension: usize,
        insert_batch_size: usize,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            table_name: table_name.to_string(),
            dimension,
            insert_batch_size: insert_batch_size.max(1),
            entries: Vec::new(),
        }
    }

    async fn connect(&self) -> Result<lancedb::Connection> {
        let uri = self
            .db_path
            .to_str()
            .ok_or_else(|| Error::config(format!("Non UTF-8 LanceDB path: {:?}", self.db_path)))?;
        lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| Error::operation(format!("Failed to connect to LanceDB: {e}")))
    }

    /// Nearest neighbours of `query` in the persisted table.
    pub async fn search(&self, query: Vec<f32>, limit: usize) -> Result<Vec<LancedbSearchResult>> {
        if query.len() != self.dimension {
            return Err(Error::validation(format!(
                "Query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let connection = self.connect().await?;
        let table = connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| Error::operation(format!("Failed to open table: {e}")))?;

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| Error::operation(format!("Failed to count rows: {e}")))?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let results = table
            .vector_search(query)
            .map_err(|e| Error::operation(format!("Failed to create vector search: {e}")))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| Error::operation(format!("Vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| Error::operation(format!("Failed to collect results: {e}")))?;

        let mut items = Vec::new();
        for batch in &batches {
            items.extend(parse_search_results(batch)?);
        }
        items.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl VectorIndexBackend for LancedbBackend {
    async fn add(&mut self, entries: Vec<VectorEntry>) -> Result<()> {
        check_dimensions(&entries, self.dimension)?;
        self.entries.extend(entries);
        Ok(())
    }

    async fn persist(&mut self) -> Result<PathBuf> {
        let connection = self.connect().await?;
        let dimension = i32::try_from(self.dimension)
            .map_err(|_| Error::config(format!("Dimension {} too large", self.dimension)))?;
        let schema = make_schema(dimension);

        let mut chunks = self.entries.chunks(self.insert_batch_size);
        let table = match chunks.next() {
            Some(first) => {
                let batch = build_record_batch(first, dimension)?;
                let batches = RecordBatchIterator::new(vec![Ok(batch)], schema.clone());
                connection
                    .create_table(&self.table_name, Box::new(batches))
                    .mode(lancedb::database::CreateTableMode::Overwrite)
                    .execute()
                    .await
                    .map_err(|e| Error::operation(format!("Failed to create LanceDB table: {e}")))?
            }
            None => connection
                .create_empty_table(&self.table_name, schema.clone())
                .mode(lancedb::database::CreateTableMode::Overwrite)
                .execute()
                .await
                .map_err(|e| Error::operation(format!("Failed to create LanceDB table: {e}")))?,
        };

        for chunk in chunks {
            let batch = build_record_batch(chunk, dimension)?;
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema.clone());
            table
                .add(Box::new(batches))
                .execute()
                .await
                .map_err(|e| Error::operation(format!("Failed to insert into LanceDB: {e}")))?;
        }

        log::info!(
            "LanceDB table '{}' with {} vectors written to {}",
            self.table_name,
            self.entries.len(),
            self.db_path.display()
        );
        Ok(self.db_path.clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn artifact_path(&self) -> &Path {
        &self.db_path
    }

    fn name(&self) -> &str {
        "lancedb"
    }
}

impl std::fmt::Debug for LancedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LancedbBackend")
            .field("db_path", &self.db_path)
            .field("table", &self.table_name)
            .field("entries", &self.entries.len())
            .finish()
    }
}

// ============================================================================
// Arrow schema and batch construction
// ============================================================================

/// Create the Arrow schema for the pictogram table.
fn make_schema(dimension: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("concept_nl", DataType::Utf8, false),
        Field::new("image_path", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension,
            ),
            false,
        ),
    ]))
}

/// Build an Arrow RecordBatch from entries.
fn build_record_batch(entries: &[VectorEntry], dimension: i32) -> Result<RecordBatch> {
    let schema = make_schema(dimension);

    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    let concepts: Vec<&str> = entries
        .iter()
        .map(|e| e.metadata.concept_nl.as_str())
        .collect();
    let image_paths: Vec<&str> = entries
        .iter()
        .map(|e| e.metadata.image_path.as_str())
        .collect();
    let metadata_strings = entries
        .iter()
        .map(|e| serde_json::to_string(&e.metadata))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let metadata_refs: Vec<&str> = metadata_strings.iter().map(|s| s.as_str()).collect();

    // Flatten embeddings into a single Vec<f32>
    let all_values: Vec<f32> = entries
        .iter()
        .flat_map(|e| e.vector.iter().copied())
        .collect();

    let values_array = Float32Array::from(all_values);
    let vector_array = FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        dimension,
        Arc::new(values_array),
        None,
    )
    .map_err(|e| Error::operation(format!("Failed to create vector array: {e}")))?;

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(concepts)),
            Arc::new(StringArray::from(image_paths)),
            Arc::new(StringArray::from(metadata_refs)),
            Arc::new(vector_array),
        ],
    )
    .map_err(|e| Error::operation(format!("Failed to create RecordBatch: {e}")))
}

/// Parse search results from a RecordBatch.
fn parse_search_results(batch: &RecordBatch) -> Result<Vec<LancedbSearchResult>> {
    let id_col = batch
        .column_by_name("id")
        .ok_or_else(|| Error::operation("Missing 'id' column in results"))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::operation("'id' column is not StringArray"))?;

    let metadata_col = batch
        .column_by_name("metadata")
        .ok_or_else(|| Error::operation("Missing 'metadata' column in results"))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::operation("'metadata' column is not StringArray"))?;

    let distance_col = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut results = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let distance = distance_col.map(|c| c.value(i)).unwrap_or(0.0);
        results.push(LancedbSearchResult {
            id: id_col.value(i).to_string(),
            // Distance-to-score normalization: 1/(1 + distance)
            score: 1.0 / (1.0 + distance),
            distance,
            metadata: serde_json::from_str(metadata_col.value(i)).ok(),
        });
    }

    Ok(results)
}

// ============================================================================
// Tests
// ============================================================================
