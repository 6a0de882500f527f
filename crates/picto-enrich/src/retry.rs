//! Retry policy for enrichment calls.
//!
//! This is the only place in the pipeline that retries. Callers further up
//! record failures instead of retrying them, so backoff never compounds.

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;

use crate::config::EnrichConfig;
use picto_core::{Error, Result};

/// Exponential backoff over retryable [`Error::Api`] failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    /// Default settings:
    /// - Max attempts: 3
    /// - Initial delay: 2 seconds
    /// - Max delay: 30 seconds
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy from the enrichment configuration.
    pub fn from_config(config: &EnrichConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
        }
    }

    /// Sets the maximum number of attempts (first try included).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the initial delay between retries.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Maximum number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `op`, retrying while it fails with a retryable error.
    ///
    /// Once attempts are exhausted the last error is returned as a
    /// non-retryable [`Error::Api`] so nothing above retries it again.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize);

        let result = op
            .retry(backoff)
            .when(Error::is_retryable)
            .notify(|err: &Error, delay: Duration| {
                log::warn!("{label}: attempt failed ({err}), retrying in {delay:?}");
            })
            .await;

        result.map_err(|err| match err {
            Error::Api {
                message,
                retryable: true,
            } => Error::api(format!(
                "{label}: giving up after {} attempts: {message}",
                self.max_attempts
            )),
            other => other,
        })
    }
}
