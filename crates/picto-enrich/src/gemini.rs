//! Gemini API provider implementation.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::provider::{EnrichmentProvider, EnrichmentRequest};
use crate::config::EnrichConfig;
use picto_core::{Error, Result};

/// Enrichment provider using Google's Gemini `generateContent` API.
pub struct GeminiProvider {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key
    /// * `api_base` - API base URL (e.g., `https://generativelanguage.googleapis.com/v1beta`)
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Creates a provider from the enrichment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no API key is configured.
    pub fn from_config(config: &EnrichConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            Error::config("No Gemini API key: set enrich.api_key or GEMINI_API_KEY")
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

/// Build the `generateContent` request body.
fn request_body(request: &EnrichmentRequest) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": request.prompt },
                {
                    "inline_data": {
                        "mime_type": request.image.mime_type,
                        "data": request.image.to_base64(),
                    }
                }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json"
        }
    })
}

/// Classify a non-success HTTP status.
fn status_error(status: StatusCode, body: &str) -> Error {
    let message = format!("Gemini API error {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        Error::api_transient(message)
    } else {
        Error::api(message)
    }
}

/// Classify a transport-level failure.
fn transport_error(context: &str, err: reqwest::Error) -> Error {
    let message = format!("{context}: {err}");
    if err.is_timeout() || err.is_connect() || err.is_request() {
        Error::api_transient(message)
    } else {
        Error::api(message)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &serde_json::Value) -> Result<String> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates");
            Error::malformed(
                format!("Gemini returned no content ({reason})"),
                body.to_string(),
            )
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect();
    Ok(text)
}

#[async_trait]
impl EnrichmentProvider for GeminiProvider {
    async fn available_models(&self) -> Result<Vec<String>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", "1000".to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(format!("{}/models", self.api_base))
                .header("x-goog-api-key", &self.api_key)
                .query(&query)
                .send()
                .await
                .map_err(|e| transport_error("Failed to list Gemini models", e))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(status_error(status, &error_text));
            }

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| transport_error("Failed to parse Gemini model list", e))?;

            if let Some(entries) = body["models"].as_array() {
                models.extend(
                    entries
                        .iter()
                        .filter(|m| {
                            m["supportedGenerationMethods"]
                                .as_array()
                                .is_some_and(|methods| {
                                    methods.iter().any(|x| x == "generateContent")
                                })
                        })
                        .filter_map(|m| m["name"].as_str().map(String::from)),
                );
            }

            match body["nextPageToken"].as_str() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        log::debug!("Gemini offers {} generateContent models", models.len());
        Ok(models)
    }

    async fn generate(&self, model: &str, request: &EnrichmentRequest) -> Result<String> {
        let response = self
            .client
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| transport_error("Failed to call Gemini API", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &error_text));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| transport_error("Failed to read Gemini response", e))?;

        extract_text(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}
