//! Core traits shared by the picto crates.
//!
//! The primary trait is [`ConfigProvider`], which abstracts how the
//! pipeline locates its inputs and artifacts.

use std::path::PathBuf;

use crate::Result;

/// Path kinds every [`ConfigProvider`] must resolve.
pub mod path_kind {
    /// Directory holding the source pictogram images.
    pub const IMAGES: &str = "images";
    /// The raw enrichment ledger file.
    pub const LEDGER: &str = "ledger";
    /// Directory receiving the metadata and index artifacts.
    pub const OUTPUT: &str = "output";
}

/// Trait for pipeline configuration.
///
/// The configuration is built once at startup and handed to the pipeline
/// by value; components never look it up globally.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use picto_core::traits::{path_kind, ConfigProvider};
/// use picto_core::Result;
///
/// #[derive(Clone)]
/// struct FixedConfig {
///     data_dir: PathBuf,
/// }
///
/// impl ConfigProvider for FixedConfig {
///     fn project_name(&self) -> &str {
///         "pictograms"
///     }
///
///     fn base_path(&self) -> Result<PathBuf> {
///         Ok(self.data_dir.clone())
///     }
///
///     fn content_path(&self, kind: &str) -> Result<PathBuf> {
///         match kind {
///             path_kind::LEDGER => Ok(self.data_dir.join("enrichment.json")),
///             other => Ok(self.data_dir.join(other)),
///         }
///     }
/// }
///
/// let config = FixedConfig { data_dir: PathBuf::from("/data") };
/// assert_eq!(
///     config.content_path(path_kind::LEDGER).unwrap(),
///     PathBuf::from("/data/enrichment.json")
/// );
/// ```
pub trait ConfigProvider: Send + Sync + Clone + 'static {
    /// The project name, used for env var prefixes and default paths.
    fn project_name(&self) -> &str;

    /// Base path for all pipeline data.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined.
    fn base_path(&self) -> Result<PathBuf>;

    /// Path for one of the [`path_kind`] locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind is unknown or the path cannot be
    /// resolved.
    fn content_path(&self, kind: &str) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestConfig {
        name: String,
        base: PathBuf,
    }

    impl ConfigProvider for TestConfig {
        fn project_name(&self) -> &str {
            &self.name
        }

        fn base_path(&self) -> Result<PathBuf> {
            Ok(self.base.clone())
        }

        fn content_path(&self, kind: &str) -> Result<PathBuf> {
            match kind {
                path_kind::IMAGES | path_kind::LEDGER | path_kind::OUTPUT => {
                    Ok(self.base.join(kind))
                }
                other => Err(crate::Error::config(format!("Unknown path kind: {other}"))),
            }
        }
    }

    #[test]
    fn test_config_provider_paths() {
        let config = TestConfig {
            name: "test".into(),
            base: PathBuf::from("/data"),
        };
        assert_eq!(config.project_name(), "test");
        assert_eq!(config.base_path().unwrap(), PathBuf::from("/data"));
        assert_eq!(
            config.content_path(path_kind::IMAGES).unwrap(),
            PathBuf::from("/data/images")
        );
    }

    #[test]
    fn test_config_provider_unknown_kind() {
        let config = TestConfig {
            name: "test".into(),
            base: PathBuf::from("/data"),
        };
        assert!(config.content_path("graphs").is_err());
    }

    #[test]
    fn test_config_provider_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TestConfig>();
    }
}
