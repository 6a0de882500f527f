//! File utilities for the picto pipeline.
//!
//! Provides image discovery for the enrichment stage and the durable
//! write primitive that every persisted artifact goes through.

use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::{Error, Result};

/// Options for scanning a directory for source images.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Accepted file extensions (without dot), compared case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::images()
    }
}

impl ScanOptions {
    /// Options matching PNG pictograms.
    pub fn images() -> Self {
        Self {
            extensions: vec!["png".to_string()],
        }
    }

    /// Replace the accepted extensions.
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

/// Enumerate eligible images directly inside `dir`.
///
/// The scan is not recursive. Results are sorted lexically by path so an
/// unchanged directory always yields the same order.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if `dir` does not exist or is not a directory.
///
/// # Example
///
/// ```no_run
/// # use picto_core::util::files::{scan_images, ScanOptions};
/// # use std::path::Path;
/// # async fn example() -> picto_core::Result<()> {
/// let images = scan_images(Path::new("pictograms"), &ScanOptions::images()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn scan_images(dir: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let is_dir = fs::metadata(dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(Error::not_found(format!(
            "Image directory not found or is not a directory: {}",
            dir.display()
        )));
    }

    let mut images = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| Error::io_with_path(e, dir))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(e, dir))?
    {
        let file_type = entry.file_type().await.map_err(Error::io)?;
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        if options.accepts(&path) {
            images.push(path);
        }
    }

    images.sort();
    log::debug!("Found {} images in {}", images.len(), dir.display());
    Ok(images)
}

/// Read a file's bytes.
pub async fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path)
        .await
        .map_err(|e| Error::io_with_path(e, path))
}

/// Check if a path exists.
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Durably replace the contents of `path`.
///
/// The bytes go to a sibling `.tmp` file which is flushed to disk before
/// being renamed over the target, so readers only ever observe the old or
/// the new contents. Parent directories are created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| Error::io_with_path(e, &parent))?;

    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| Error::operation(format!("Not a file path: {}", path.display())))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);

    {
        let mut file =
            std::fs::File::create(&tmp_path).map_err(|e| Error::io_with_path(e, &tmp_path))?;
        file.write_all(bytes)
            .map_err(|e| Error::io_with_path(e, &tmp_path))?;
        file.sync_all()
            .map_err(|e| Error::io_with_path(e, &tmp_path))?;
    }

    std::fs::rename(&tmp_path, path).map_err(|e| Error::io_with_path(e, path))?;

    // Persist the rename itself.
    #[cfg(unix)]
    std::fs::File::open(&parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| Error::io_with_path(e, &parent))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_images_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("zwemmen.png"), b"z").await.unwrap();
        fs::write(temp.path().join("auto wassen.png"), b"a")
            .await
            .unwrap();
        fs::write(temp.path().join("eten.PNG"), b"e").await.unwrap();
        fs::write(temp.path().join("notes.txt"), b"skip").await.unwrap();
        fs::create_dir(temp.path().join("nested.png")).await.unwrap();

        let images = scan_images(temp.path(), &ScanOptions::images())
            .await
            .unwrap();

        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["auto wassen.png", "eten.PNG", "zwemmen.png"]);
    }

    #[tokio::test]
    async fn test_scan_images_not_recursive() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).await.unwrap();
        fs::write(temp.path().join("sub").join("deep.png"), b"d")
            .await
            .unwrap();

        let images = scan_images(temp.path(), &ScanOptions::images())
            .await
            .unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_scan_images_repeatable() {
        let temp = TempDir::new().unwrap();
        for name in ["c.png", "a.png", "b.png"] {
            fs::write(temp.path().join(name), b"x").await.unwrap();
        }

        let first = scan_images(temp.path(), &ScanOptions::images())
            .await
            .unwrap();
        let second = scan_images(temp.path(), &ScanOptions::images())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scan_images_missing_dir() {
        let temp = TempDir::new().unwrap();
        let err = scan_images(&temp.path().join("missing"), &ScanOptions::images())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_scan_images_file_is_not_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.png");
        fs::write(&file, b"x").await.unwrap();

        let err = scan_images(&file, &ScanOptions::images())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_scan_images_custom_extensions() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.png"), b"x").await.unwrap();
        fs::write(temp.path().join("b.jpg"), b"x").await.unwrap();
        fs::write(temp.path().join("c.webp"), b"x").await.unwrap();

        let options = ScanOptions::images().with_extensions(&[".jpg", "WEBP"]);
        let images = scan_images(temp.path(), &options).await.unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("ledger.json");

        write_atomic(&path, b"[1]").unwrap();
        write_atomic(&path, b"[1,2]").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2]");
        assert!(!temp.path().join("out").join("ledger.json.tmp").exists());
    }

    #[test]
    fn test_write_atomic_into_existing_dir_syncs_and_succeeds() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.json");

        write_atomic(&path, b"[]").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[]");
        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_read_bytes_and_exists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("img.png");
        assert!(!exists(&path).await);

        fs::write(&path, [0x89, b'P', b'N', b'G']).await.unwrap();
        assert!(exists(&path).await);
        assert_eq!(read_bytes(&path).await.unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_read_bytes_missing() {
        let temp = TempDir::new().unwrap();
        let err = read_bytes(&temp.path().join("nope.png")).await.unwrap_err();
        assert!(err.to_string().contains("nope.png"));
    }
}
