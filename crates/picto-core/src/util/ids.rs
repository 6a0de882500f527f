//! Identifier helpers.
//!
//! A pictogram's identity comes from its file name: the stem of
//! `auto wassen.png` is the `source_id` `"auto wassen"`. Everything
//! downstream (ledger keys, record ids, index ids) is derived from it
//! without randomness so re-runs line up.

use std::path::Path;

/// Derive the stable source identifier from an image path (its file stem).
///
/// Returns `None` if the path has no usable UTF-8 file stem.
pub fn source_id_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Derive the canonical record id from a source identifier.
///
/// Surrounding whitespace is dropped and inner whitespace runs collapse to a
/// single space. Case and punctuation are kept, so distinct source ids map to
/// distinct record ids.
pub fn record_id(source_id: &str) -> String {
    source_id.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn a source identifier into a human-readable concept label.
///
/// Underscores and hyphens become spaces (`"tanden-poetsen"` →
/// `"tanden poetsen"`).
pub fn concept_from_source_id(source_id: &str) -> String {
    record_id(&source_id.replace(['_', '-'], " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_source_id_from_path() {
        let path = PathBuf::from("/data/img/auto wassen.png");
        assert_eq!(source_id_from_path(&path), Some("auto wassen".to_string()));
    }

    #[test]
    fn test_source_id_from_path_without_extension() {
        assert_eq!(
            source_id_from_path(Path::new("eten")),
            Some("eten".to_string())
        );
    }

    #[test]
    fn test_source_id_from_path_empty() {
        assert_eq!(source_id_from_path(Path::new("/")), None);
    }

    #[test]
    fn test_record_id_deterministic() {
        assert_eq!(record_id("auto wassen"), record_id("auto wassen"));
        assert_eq!(record_id("  auto   wassen "), "auto wassen");
        assert_ne!(record_id("Auto wassen"), record_id("auto-wassen"));
    }

    #[test]
    fn test_concept_from_source_id() {
        assert_eq!(concept_from_source_id("tanden-poetsen"), "tanden poetsen");
        assert_eq!(concept_from_source_id("naar_bed_gaan"), "naar bed gaan");
        assert_eq!(concept_from_source_id("eten"), "eten");
    }
}
