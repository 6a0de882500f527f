//! Configuration for the picto-index CLI.
//!
//! Provides the [`PictoConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `PICTO_CONFIG` environment variable
//! 3. XDG default: `~/.config/picto-index/config.toml`
//! 4. Built-in defaults
//!
//! `PICTO_<SECTION>_<KEY>` environment variables override string values of
//! the `paths`, `enrich` and `vector` sections.

use confyg::{env, Confygery};
use picto_core::traits::{path_kind, ConfigProvider};
use picto_core::{Error, Result};
use picto_enrich::EnrichConfig;
use picto_vector::VectorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the config directory under the XDG config root.
pub const CONFIG_DIR_NAME: &str = "picto-index";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PICTO_CONFIG";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PictoConfig {
    /// Project name, used in logs and the version banner.
    pub project_name: String,

    /// Base path that relative `paths` entries resolve against.
    pub base_path: Option<String>,

    /// Input and artifact locations.
    pub paths: PathsConfig,

    /// Stage 1 settings.
    pub enrich: EnrichConfig,

    /// Stage 2 settings.
    pub vector: VectorConfig,
}

/// Input and artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the source pictogram images.
    pub images: String,

    /// The raw enrichment ledger file.
    pub ledger: String,

    /// Directory receiving `pictogram_data.json` and the index.
    pub output: String,
}

impl Default for PictoConfig {
    fn default() -> Self {
        Self {
            project_name: CONFIG_DIR_NAME.to_string(),
            base_path: None,
            paths: PathsConfig::default(),
            enrich: EnrichConfig::default(),
            vector: VectorConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            images: "pictograms".to_string(),
            ledger: "enriched_pictograms.json".to_string(),
            output: "vector_db".to_string(),
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl PictoConfig {
    /// Load configuration from file, environment, and defaults.
    ///
    /// A config path that does not exist is not an error; the defaults
    /// apply.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path) {
            if path.exists() {
                log::debug!("Loading configuration from {}", path.display());
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            }
        }

        let mut env_opts = env::Options::with_top_level("PICTO");
        env_opts.add_section("paths");
        env_opts.add_section("enrich");
        env_opts.add_section("vector");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    ///
    /// The API key is never written out.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    fn resolve(&self, configured: &str) -> Result<PathBuf> {
        let path = PathBuf::from(configured);
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.base_path()?.join(path))
        }
    }
}

// ============================================================================
// ConfigProvider implementation
// ============================================================================

impl ConfigProvider for PictoConfig {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn base_path(&self) -> Result<PathBuf> {
        match &self.base_path {
            Some(p) => Ok(PathBuf::from(p)),
            None => std::env::current_dir()
                .map_err(|e| Error::config(format!("Could not determine base path: {e}"))),
        }
    }

    fn content_path(&self, kind: &str) -> Result<PathBuf> {
        match kind {
            path_kind::IMAGES => self.resolve(&self.paths.images),
            path_kind::LEDGER => self.resolve(&self.paths.ledger),
            path_kind::OUTPUT => self.resolve(&self.paths.output),
            other => Err(Error::config(format!("Unknown path kind: '{other}'"))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
