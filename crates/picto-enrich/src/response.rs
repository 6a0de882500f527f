//! Enrichment response contract.
//!
//! The model must answer with a single JSON object:
//!
//! ```text
//! {"translations":{"en":"..","fr":"..","de":".."},"tags":["..",..],"description":".."}
//! ```
//!
//! with 5 to 7 lowercase tags. Anything else is a
//! [`MalformedResponse`](picto_core::Error::MalformedResponse).

use serde::{Deserialize, Serialize};

use picto_core::{Error, Result};

/// Minimum number of tags in a valid response.
pub const MIN_TAGS: usize = 5;

/// Maximum number of tags in a valid response.
pub const MAX_TAGS: usize = 7;

/// Translations of the pictogram concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Translations {
    /// English.
    pub en: String,
    /// French.
    pub fr: String,
    /// German.
    pub de: String,
}

/// Structured metadata produced by the model for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichmentOutput {
    /// Concept translations.
    pub translations: Translations,
    /// Lowercase keywords.
    pub tags: Vec<String>,
    /// One descriptive sentence.
    pub description: String,
}

/// Parse and check a raw model response.
///
/// Markdown code fences around the object are stripped first; models add
/// them even when asked not to.
pub fn parse_response(raw: &str) -> Result<EnrichmentOutput> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(Error::malformed("empty response", raw));
    }

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| Error::malformed(format!("invalid JSON: {e}"), raw))?;
    if !value.is_object() {
        return Err(Error::malformed("expected a single JSON object", raw));
    }

    let output: EnrichmentOutput = serde_json::from_value(value)
        .map_err(|e| Error::malformed(format!("unexpected structure: {e}"), raw))?;

    check_output(&output).map_err(|msg| Error::malformed(msg, raw))?;
    Ok(output)
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn check_output(output: &EnrichmentOutput) -> std::result::Result<(), String> {
    let t = &output.translations;
    for (lang, text) in [("en", &t.en), ("fr", &t.fr), ("de", &t.de)] {
        if text.trim().is_empty() {
            return Err(format!("translation '{lang}' is empty"));
        }
    }

    if !(MIN_TAGS..=MAX_TAGS).contains(&output.tags.len()) {
        return Err(format!(
            "expected {MIN_TAGS}-{MAX_TAGS} tags, got {}",
            output.tags.len()
        ));
    }
    for tag in &output.tags {
        if tag.trim().is_empty() {
            return Err("tags contain an empty string".to_string());
        }
        if *tag != tag.to_lowercase() {
            return Err(format!("tag '{tag}' is not lowercase"));
        }
    }

    if output.description.trim().is_empty() {
        return Err("description is empty".to_string());
    }
    Ok(())
}
