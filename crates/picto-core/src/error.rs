//! Error types for pictogram indexing operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all picto crates. Uses `thiserror` for derive macros.
//!
//! The variants follow how a failure propagates through the pipeline:
//!
//! - Whole-run failures: [`Error::NotFound`], [`Error::Config`]
//! - Per-image failures (recorded, the run continues): [`Error::Api`],
//!   [`Error::MalformedResponse`]
//! - Per-record failures (rejected, the run continues): [`Error::Validation`]

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in pictogram indexing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with the offending path attached.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error (no viable model, backend or resource).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required filesystem input is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Enrichment API failure.
    #[error("API error: {message}")]
    Api {
        /// Description of the failure, including the last underlying cause.
        message: String,
        /// Whether retrying the same call may succeed.
        retryable: bool,
    },

    /// The model answered, but not with the expected JSON object.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// What was wrong with the response.
        message: String,
        /// The raw response text, kept for inspection.
        raw: String,
    },

    /// A record does not satisfy the schema contract.
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other failed operation.
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Create an I/O error.
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(err)
    }

    /// Create an I/O error for a specific path.
    pub fn io_with_path(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source: err,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a retryable API error (rate limiting, 5xx, timeouts).
    pub fn api_transient(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create a non-retryable API error.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create a malformed response error carrying the raw response.
    pub fn malformed(msg: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: msg.into(),
            raw: raw.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a generic operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Whether retrying the failed call may produce a different outcome.
    ///
    /// Only transient API failures qualify. A malformed response is
    /// deterministic and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Api {
                retryable: true,
                ..
            }
        )
    }

    /// Whether this failure concerns a single item and should be recorded
    /// rather than abort the run.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::MalformedResponse { .. } | Self::Validation(_)
        )
    }

    /// Short, stable label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::IoWithPath { .. } => "io",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::Api { .. } => "api",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Validation(_) => "validation",
            Self::Json(_) => "serialization",
            Self::Operation(_) => "operation",
        }
    }

    /// The raw model output, for malformed responses.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Result type alias using the picto `Error` type.
pub type Result<T> = std::result::Result<T, Error>;
