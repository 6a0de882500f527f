//! Enrichment client: model selection, retries and response parsing on top
//! of an [`EnrichmentProvider`].

use std::sync::Arc;

use crate::config::EnrichConfig;
use crate::prompt::build_prompt;
use crate::provider::{EnrichmentProvider, EnrichmentRequest, ImagePayload};
use crate::response::{parse_response, EnrichmentOutput};
use crate::retry::RetryPolicy;
use picto_core::{Error, Result};

/// Wraps an [`EnrichmentProvider`] with the enrichment contract.
///
/// Transport failures are retried according to the [`RetryPolicy`];
/// malformed responses are returned immediately.
pub struct EnrichmentClient {
    provider: Arc<dyn EnrichmentProvider>,
    retry: RetryPolicy,
    requested_model: Option<String>,
    fast_model: String,
    capable_model: String,
    selected_model: Option<String>,
}

impl EnrichmentClient {
    /// Creates a client from the enrichment configuration.
    pub fn new(provider: Arc<dyn EnrichmentProvider>, config: &EnrichConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy::from_config(config),
            requested_model: config.model.as_deref().map(normalize_model_id),
            fast_model: normalize_model_id(&config.fast_model),
            capable_model: normalize_model_id(&config.capable_model),
            selected_model: None,
        }
    }

    /// Overrides the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The provider name for diagnostics.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The model chosen by [`select_model`](Self::select_model), if any.
    pub fn model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Chooses the model used for subsequent [`enrich`](Self::enrich) calls.
    ///
    /// An explicitly configured model is used without consulting the
    /// provider. Otherwise the fast model is preferred and the capable
    /// model is the fallback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when neither candidate is available or the
    /// model list cannot be retrieved.
    pub async fn select_model(&mut self) -> Result<String> {
        if let Some(model) = &self.selected_model {
            return Ok(model.clone());
        }

        if let Some(model) = &self.requested_model {
            log::info!("Using configured model: {model}");
            self.selected_model = Some(model.clone());
            return Ok(model.clone());
        }

        log::info!("Discovering available models via {}...", self.provider.name());
        let provider = self.provider.clone();
        let available = self
            .retry
            .run("list models", || {
                let provider = provider.clone();
                async move { provider.available_models().await }
            })
            .await
            .map_err(|e| Error::config(format!("Could not list available models: {e}")))?;

        let available: Vec<String> = available.iter().map(|m| normalize_model_id(m)).collect();
        let chosen = [&self.fast_model, &self.capable_model]
            .into_iter()
            .find(|candidate| available.iter().any(|m| m == *candidate))
            .cloned()
            .ok_or_else(|| {
                Error::config(format!(
                    "Neither '{}' nor '{}' is available",
                    self.fast_model, self.capable_model
                ))
            })?;

        if chosen != self.fast_model {
            log::warn!(
                "Preferred model '{}' unavailable, falling back to '{chosen}'",
                self.fast_model
            );
        }
        log::info!("Selected model: {chosen}");
        self.selected_model = Some(chosen.clone());
        Ok(chosen)
    }

    /// Enriches one image.
    ///
    /// # Errors
    ///
    /// - [`Error::Api`] when the call keeps failing after all attempts
    /// - [`Error::MalformedResponse`] when the model's answer breaks the
    ///   response contract (never retried)
    /// - [`Error::Config`] when no model has been selected
    pub async fn enrich(&self, image: &ImagePayload, hint: &str) -> Result<EnrichmentOutput> {
        let model = self
            .selected_model
            .as_deref()
            .ok_or_else(|| Error::config("No model selected; call select_model first"))?;

        log::info!("Requesting enrichment for '{hint}'...");
        let request = EnrichmentRequest::new(hint, build_prompt(hint), image.clone());
        let provider = self.provider.clone();
        let request = &request;

        let raw = self
            .retry
            .run(hint, || {
                let provider = provider.clone();
                async move { provider.generate(model, request).await }
            })
            .await?;

        parse_response(&raw)
    }
}

impl std::fmt::Debug for EnrichmentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentClient")
            .field("provider", &self.provider.name())
            .field("retry", &self.retry)
            .field("selected_model", &self.selected_model)
            .finish()
    }
}

/// Strip the `models/` resource prefix used by the Gemini API.
fn normalize_model_id(model: &str) -> String {
    model.trim().trim_start_matches("models/").to_string()
}
