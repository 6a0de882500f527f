//! Ledger records to the canonical pictogram schema.
//!
//! Every ledger record ends up either in the normalized set or in the
//! rejected list with a reason. Nothing is dropped silently, and the ledger
//! itself is only read.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::types::{NormalizedPictogramRecord, RejectedRecord};
use picto_core::{concept_from_source_id, record_id};
use picto_enrich::{EnrichmentLedger, RawEnrichmentRecord, Translations};

/// Result of normalizing a ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationOutcome {
    /// Valid records, in ledger order.
    pub records: Vec<NormalizedPictogramRecord>,
    /// Records that failed validation.
    pub rejected: Vec<RejectedRecord>,
}

/// Validate and map every ledger record.
pub fn normalize(ledger: &EnrichmentLedger) -> NormalizationOutcome {
    let mut outcome = NormalizationOutcome::default();
    let mut seen_ids = HashSet::new();

    for raw in ledger.iter() {
        match normalize_record(raw) {
            Ok(record) if !seen_ids.insert(record.id.clone()) => {
                outcome.rejected.push(RejectedRecord {
                    source_id: raw.source_id.clone(),
                    reason: format!("duplicate id '{}'", record.id),
                });
            }
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                log::warn!("Rejecting '{}': {reason}", raw.source_id);
                outcome.rejected.push(RejectedRecord {
                    source_id: raw.source_id.clone(),
                    reason,
                });
            }
        }
    }

    log::info!(
        "Normalized {} records, rejected {}",
        outcome.records.len(),
        outcome.rejected.len()
    );
    outcome
}

/// Map one record, or explain why it cannot be mapped.
pub fn normalize_record(raw: &RawEnrichmentRecord) -> Result<NormalizedPictogramRecord, String> {
    let id = record_id(&raw.source_id);
    if id.is_empty() {
        return Err("source_id is empty".to_string());
    }

    let image_path = raw.image_path.trim();
    if image_path.is_empty() {
        return Err("image_path is missing".to_string());
    }

    let description_nl = required_string(raw, &["description_nl", "description"])?;
    let tags_nl: Vec<String> = string_list(raw, &["tags_nl", "tags"])?
        .ok_or_else(|| "tags are missing".to_string())?
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();
    if tags_nl.is_empty() {
        return Err("tags are empty".to_string());
    }

    let translations = translations(raw)?;

    let concept_nl = match optional_string(raw, "concept_nl")? {
        Some(concept) => concept,
        None => concept_from_source_id(&raw.source_id),
    };
    let synonyms_nl = string_list(raw, &["synonyms_nl"])?.unwrap_or_default();
    let categories = string_list(raw, &["categories"])?.unwrap_or_default();

    Ok(NormalizedPictogramRecord {
        id,
        image_path: image_path.to_string(),
        concept_nl,
        description_nl,
        tags_nl,
        synonyms_nl,
        categories,
        translations,
    })
}

/// The first present key among `keys`.
fn first_present<'a>(raw: &'a RawEnrichmentRecord, keys: &[&'a str]) -> Option<(&'a str, &'a Value)> {
    keys.iter()
        .find_map(|key| raw.field(key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn required_string(raw: &RawEnrichmentRecord, keys: &[&str]) -> Result<String, String> {
    let Some((key, value)) = first_present(raw, keys) else {
        return Err(format!("{} is missing", keys[keys.len() - 1]));
    };
    non_empty_string(key, value)
}

fn optional_string(raw: &RawEnrichmentRecord, key: &str) -> Result<Option<String>, String> {
    match raw.field(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => non_empty_string(key, value).map(Some),
    }
}

fn non_empty_string(key: &str, value: &Value) -> Result<String, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("{key} is not a string"))?
        .trim();
    if s.is_empty() {
        return Err(format!("{key} is empty"));
    }
    Ok(s.to_string())
}

/// An array of non-empty strings, or `None` when no key is present.
fn string_list(raw: &RawEnrichmentRecord, keys: &[&str]) -> Result<Option<Vec<String>>, String> {
    let Some((key, value)) = first_present(raw, keys) else {
        return Ok(None);
    };
    let items = value
        .as_array()
        .ok_or_else(|| format!("{key} is not an array"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| non_empty_string(&format!("{key}[{i}]"), item))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn translations(raw: &RawEnrichmentRecord) -> Result<Translations, String> {
    let value = raw
        .field("translations")
        .filter(|v| !v.is_null())
        .ok_or_else(|| "translations are missing".to_string())?;
    if !value.is_object() {
        return Err("translations is not an object".to_string());
    }
    let lang = |code: &str| match value.get(code) {
        Some(v) => non_empty_string(&format!("translations.{code}"), v),
        None => Err(format!("translations.{code} is missing")),
    };
    Ok(Translations {
        en: lang("en")?,
        fr: lang("fr")?,
        de: lang("de")?,
    })
}
