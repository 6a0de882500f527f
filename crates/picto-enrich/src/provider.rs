//! Enrichment provider abstraction.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

use picto_core::{Error, Result};

/// Abstraction over multimodal generative model APIs (Gemini, test mocks).
///
/// Providers only move bytes: they list models and return the model's raw
/// text. Retrying and response parsing belong to
/// [`EnrichmentClient`](crate::EnrichmentClient).
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Lists the ids of models that can serve [`generate`](Self::generate).
    async fn available_models(&self) -> Result<Vec<String>>;

    /// Sends one request to `model` and returns the raw response text.
    ///
    /// Transport failures must be reported as [`Error::Api`], with
    /// `retryable` set for rate limiting and transient server failures.
    async fn generate(&self, model: &str, request: &EnrichmentRequest) -> Result<String>;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

/// A single multimodal enrichment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    /// Filename-derived hint (the pictogram's source id).
    pub hint: String,

    /// Instructional text sent with the image.
    pub prompt: String,

    /// The image itself.
    pub image: ImagePayload,
}

impl EnrichmentRequest {
    /// Creates a new request.
    pub fn new(hint: impl Into<String>, prompt: impl Into<String>, image: ImagePayload) -> Self {
        Self {
            hint: hint.into(),
            prompt: prompt.into(),
            image,
        }
    }
}

/// Raw image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,

    /// Encoded image bytes.
    pub data: Vec<u8>,
}

impl ImagePayload {
    /// Creates a payload from bytes.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Reads an image file, inferring the MIME type from its extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let mime_type = mime_type_for(path)?;
        let data = picto_core::util::files::read_bytes(path).await?;
        if data.is_empty() {
            return Err(Error::operation(format!(
                "Image file is empty: {}",
                path.display()
            )));
        }
        Ok(Self::new(mime_type, data))
    }

    /// The bytes as standard base64, for inline transport.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

fn mime_type_for(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        other => Err(Error::operation(format!(
            "Unsupported image type '{other}': {}",
            path.display()
        ))),
    }
}
