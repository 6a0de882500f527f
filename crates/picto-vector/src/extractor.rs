//! Embedding text composition.
//!
//! The extractor decides what text represents a pictogram in vector space.
//! The embedding provider then turns that text into a vector. Keeping the
//! two apart means the text can be inspected and tested on its own.

use crate::types::{EmbeddingTextRecord, NormalizedPictogramRecord};

/// Trait for composing the embedded text of a normalized record.
///
/// Implementations must be pure: the same record always yields the same
/// text, byte for byte.
pub trait EmbeddingTextExtractor: Send + Sync {
    /// Compose the text for one record.
    fn extract_text(&self, record: &NormalizedPictogramRecord) -> String;

    /// Compose the text record for one record.
    fn extract(&self, record: &NormalizedPictogramRecord) -> EmbeddingTextRecord {
        EmbeddingTextRecord::new(record.id.clone(), self.extract_text(record))
    }

    /// Returns the name of this extractor for logging/debugging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// The default pictogram extractor.
///
/// Text layout: `"{concept}. {description}. {tags joined by ' '}"`, each
/// part cleaned with [`clean_text`].
#[derive(Clone, Debug, Default)]
pub struct PictogramTextExtractor;

impl EmbeddingTextExtractor for PictogramTextExtractor {
    fn extract_text(&self, record: &NormalizedPictogramRecord) -> String {
        build_text(record)
    }

    fn name(&self) -> &str {
        "pictogram"
    }
}

/// Build the embedding text for a record.
pub fn build_text(record: &NormalizedPictogramRecord) -> String {
    let tags: Vec<String> = record
        .tags_nl
        .iter()
        .map(|t| clean_text(t))
        .filter(|t| !t.is_empty())
        .collect();

    format!(
        "{}. {}. {}",
        clean_text(&record.concept_nl),
        clean_text(&record.description_nl),
        tags.join(" ")
    )
}

/// Normalize text for embedding.
///
/// Lowercases, then drops every character that is not an ASCII letter, a
/// Latin-1 letter in `à..=ÿ` or whitespace (digits and punctuation go too),
/// then collapses whitespace runs into single spaces.
pub fn clean_text(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|&c| c.is_ascii_lowercase() || ('à'..='ÿ').contains(&c) || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Tests
// ============================================================================
