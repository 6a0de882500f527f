//! Enrichment configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the enrichment stage.
///
/// Controls model selection, the API endpoint, retry behaviour and how
/// image paths are recorded in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Explicit model id. When unset, a model is selected from
    /// `fast_model` and `capable_model`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Preferred model id, tried first.
    pub fast_model: String,

    /// Fallback model id, used when the fast model is unavailable.
    pub capable_model: String,

    /// API key. Falls back to the `GEMINI_API_KEY` environment variable.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the generative language API.
    pub api_base: String,

    /// Maximum attempts per enrichment call (first try included).
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound on the delay between retries, in milliseconds.
    pub max_delay_ms: u64,

    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,

    /// Prefix recorded in front of the image file name in `image_path`.
    pub image_path_prefix: String,

    /// Image file extensions picked up by the scanner.
    pub image_extensions: Vec<String>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            model: None,
            fast_model: "gemini-1.5-flash-latest".to_string(),
            capable_model: "gemini-1.5-pro-latest".to_string(),
            api_key: None,
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_attempts: 3,
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
            request_timeout_secs: 60,
            image_path_prefix: "img/nl".to_string(),
            image_extensions: vec!["png".to_string()],
        }
    }
}

impl EnrichConfig {
    /// Resolve the API key from config, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Maximum delay between retries.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
