//! Mock enrichment provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::provider::{EnrichmentProvider, EnrichmentRequest};
use picto_core::{Error, Result};

/// Mock provider that answers from canned responses.
///
/// Without a canned response for a hint, a valid response mentioning the
/// hint is generated. Failures can be scripted per hint. Clones share state,
/// so a test can keep a handle for inspecting call counts.
#[derive(Clone)]
pub struct MockEnrichmentProvider {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    models: Vec<String>,
    responses: HashMap<String, String>,
    transient_failures: HashMap<String, usize>,
    permanent_failures: HashMap<String, String>,
    calls: Vec<String>,
    list_calls: usize,
}

impl Default for MockEnrichmentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEnrichmentProvider {
    /// Creates a mock offering the default fast and capable Gemini models.
    ///
    /// # Examples
    ///
    /// ```
    /// use picto_enrich::MockEnrichmentProvider;
    ///
    /// let provider = MockEnrichmentProvider::new()
    ///     .with_transient_failures("zwemmen", 2)
    ///     .with_response_for("slapen", "not json");
    /// ```
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                models: vec![
                    "models/gemini-1.5-flash-latest".to_string(),
                    "models/gemini-1.5-pro-latest".to_string(),
                ],
                responses: HashMap::new(),
                transient_failures: HashMap::new(),
                permanent_failures: HashMap::new(),
                calls: Vec::new(),
                list_calls: 0,
            })),
        }
    }

    /// A response that satisfies the enrichment contract for `hint`.
    pub fn valid_response(hint: &str) -> String {
        serde_json::json!({
            "translations": {
                "en": format!("{hint} (en)"),
                "fr": format!("{hint} (fr)"),
                "de": format!("{hint} (de)"),
            },
            "tags": ["pictogram", "actie", "dagelijks", "leven", "beeld"],
            "description": format!("Een pictogram dat {hint} uitbeeldt."),
        })
        .to_string()
    }

    /// Replaces the list of available models.
    pub fn with_models(self, models: Vec<String>) -> Self {
        self.lock().models = models;
        self
    }

    /// Answers requests for `hint` with `response`.
    pub fn with_response_for(self, hint: impl Into<String>, response: impl Into<String>) -> Self {
        self.lock().responses.insert(hint.into(), response.into());
        self
    }

    /// Fails the next `count` requests for `hint` with a retryable error.
    pub fn with_transient_failures(self, hint: impl Into<String>, count: usize) -> Self {
        self.lock().transient_failures.insert(hint.into(), count);
        self
    }

    /// Fails every request for `hint` with a non-retryable error.
    pub fn with_permanent_failure(self, hint: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock()
            .permanent_failures
            .insert(hint.into(), message.into());
        self
    }

    /// Total number of `generate` calls.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of `generate` calls for `hint`.
    pub fn calls_for(&self, hint: &str) -> usize {
        self.lock().calls.iter().filter(|h| *h == hint).count()
    }

    /// Number of `available_models` calls.
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EnrichmentProvider for MockEnrichmentProvider {
    async fn available_models(&self) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.list_calls += 1;
        Ok(state.models.clone())
    }

    async fn generate(&self, _model: &str, request: &EnrichmentRequest) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(request.hint.clone());

        if let Some(message) = state.permanent_failures.get(&request.hint) {
            return Err(Error::api(message.clone()));
        }

        if let Some(remaining) = state.transient_failures.get_mut(&request.hint) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::api_transient("503 Service Unavailable (mock)"));
            }
        }

        Ok(state
            .responses
            .get(&request.hint)
            .cloned()
            .unwrap_or_else(|| Self::valid_response(&request.hint)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
