//! The enrichment ledger: the durable record of every enriched pictogram.
//!
//! The ledger file is a JSON array of [`RawEnrichmentRecord`]s. Each
//! successful enrichment is appended and the whole file is rewritten
//! through [`write_atomic`], so an interrupted run leaves either the old or
//! the new ledger on disk, never a torn one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::response::EnrichmentOutput;
use picto_core::{write_atomic, Error, Result};

/// One enriched pictogram as the model produced it.
///
/// Output fields are kept as an open JSON map so whatever the model
/// returned survives until normalization judges it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEnrichmentRecord {
    /// File stem of the source image.
    pub source_id: String,

    /// Path the image is served from.
    #[serde(default)]
    pub image_path: String,

    /// Model output and any extra fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawEnrichmentRecord {
    /// Creates a record with no output fields.
    pub fn new(source_id: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            image_path: image_path.into(),
            fields: Map::new(),
        }
    }

    /// Creates a record from a parsed model response.
    pub fn from_output(
        source_id: impl Into<String>,
        image_path: impl Into<String>,
        output: &EnrichmentOutput,
    ) -> Result<Self> {
        let fields = match serde_json::to_value(output)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::operation(format!(
                    "enrichment output serialized to {other}, expected an object"
                )));
            }
        };
        Ok(Self {
            source_id: source_id.into(),
            image_path: image_path.into(),
            fields,
        })
    }

    /// Adds or replaces an output field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Looks up an output field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// All enrichment records, at most one per `source_id`, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentLedger {
    records: Vec<RawEnrichmentRecord>,
    index: HashMap<String, usize>,
}

impl EnrichmentLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from records, keeping the first of any duplicates.
    pub fn from_records(records: impl IntoIterator<Item = RawEnrichmentRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            if ledger.contains(&record.source_id) {
                log::warn!(
                    "Ledger holds duplicate record for '{}', keeping the first",
                    record.source_id
                );
                continue;
            }
            ledger.push(record);
        }
        ledger
    }

    /// Whether a record exists for `source_id`.
    pub fn contains(&self, source_id: &str) -> bool {
        self.index.contains_key(source_id)
    }

    /// The record for `source_id`, if any.
    pub fn get(&self, source_id: &str) -> Option<&RawEnrichmentRecord> {
        self.index.get(source_id).map(|&i| &self.records[i])
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[RawEnrichmentRecord] {
        &self.records
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RawEnrichmentRecord> {
        self.records.iter()
    }

    /// Appends a record for a new `source_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the `source_id` is already present.
    pub fn append(&mut self, record: RawEnrichmentRecord) -> Result<()> {
        if self.contains(&record.source_id) {
            return Err(Error::validation(format!(
                "ledger already holds a record for '{}'",
                record.source_id
            )));
        }
        self.push(record);
        Ok(())
    }

    /// Replaces the record for its `source_id` in place, or appends it.
    ///
    /// Used for explicit re-enrichment only.
    pub fn replace(&mut self, record: RawEnrichmentRecord) {
        match self.index.get(&record.source_id) {
            Some(&i) => self.records[i] = record,
            None => self.push(record),
        }
    }

    fn push(&mut self, record: RawEnrichmentRecord) {
        self.index
            .insert(record.source_id.clone(), self.records.len());
        self.records.push(record);
    }
}

/// On-disk shapes accepted when loading.
#[derive(Deserialize)]
#[serde(untagged)]
enum LedgerFile {
    Records(Vec<RawEnrichmentRecord>),
    Keyed(Map<String, Value>),
}

impl LedgerFile {
    fn into_records(self) -> Result<Vec<RawEnrichmentRecord>> {
        match self {
            Self::Records(records) => Ok(records),
            Self::Keyed(map) => map
                .into_iter()
                .map(|(source_id, value)| {
                    let Value::Object(mut fields) = value else {
                        return Err(Error::validation(format!(
                            "legacy ledger entry '{source_id}' is not an object"
                        )));
                    };
                    fields.remove("source_id");
                    let image_path = match fields.remove("image_path") {
                        Some(Value::String(path)) => path,
                        _ => String::new(),
                    };
                    Ok(RawEnrichmentRecord {
                        source_id,
                        image_path,
                        fields,
                    })
                })
                .collect(),
        }
    }
}

/// Loads and persists the ledger file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Creates a store for the ledger at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the ledger. A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// A ledger that exists but cannot be read or parsed is an error; it is
    /// never silently replaced.
    pub fn load(&self) -> Result<EnrichmentLedger> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No ledger at {}, starting with an empty one",
                    self.path.display()
                );
                return Ok(EnrichmentLedger::new());
            }
            Err(e) => return Err(Error::io_with_path(e, &self.path)),
        };

        if json.trim().is_empty() {
            return Ok(EnrichmentLedger::new());
        }

        let file: LedgerFile = serde_json::from_str(&json).map_err(|e| {
            Error::operation(format!(
                "Ledger {} is not a JSON array of records: {e}",
                self.path.display()
            ))
        })?;
        let ledger = EnrichmentLedger::from_records(file.into_records()?);
        log::info!(
            "Loaded {} ledger records from {}",
            ledger.len(),
            self.path.display()
        );
        Ok(ledger)
    }

    /// Writes the whole ledger durably.
    pub fn persist(&self, ledger: &EnrichmentLedger) -> Result<()> {
        let json = serde_json::to_vec_pretty(ledger.records())?;
        write_atomic(&self.path, &json)
    }
}
