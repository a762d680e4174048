//! Result and error types for esperar.

use crate::client::ClientError;
use thiserror::Error;

/// Result type for esperar operations
pub type EsperaResult<T> = Result<T, EsperaError>;

/// Errors that can occur while waiting on the DOM
#[derive(Debug, Error)]
pub enum EsperaError {
    /// A wait primitive exhausted its poll budget
    #[error("wait for {subject} timed out after {elapsed_ms}ms (budget {timeout_ms}ms)")]
    Timeout {
        /// What was being waited for (locator or predicate description)
        subject: String,
        /// Configured timeout budget in milliseconds
        timeout_ms: u64,
        /// Time actually elapsed when the wait gave up
        elapsed_ms: u64,
    },

    /// An indexed collection scan found no matching element
    #[error("no element matching '{searched}' among candidates {candidates:?}")]
    NotFound {
        /// Substring the scan was looking for
        searched: String,
        /// Candidate texts seen on the final attempt
        candidates: Vec<String>,
    },

    /// A poll policy violated `interval_ms <= timeout_ms` or used zero values
    #[error("invalid poll policy: timeout {timeout_ms}ms, interval {interval_ms}ms")]
    InvalidPolicy {
        /// Offending timeout
        timeout_ms: u64,
        /// Offending interval
        interval_ms: u64,
    },

    /// A non-retryable failure from the underlying browser client
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The real browser could not be started
    #[error("failed to launch browser: {message}")]
    BrowserLaunch {
        /// Underlying failure description
        message: String,
    },

    /// Failure while persisting failure artifacts
    #[error("artifact capture failed: {message}")]
    Artifact {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EsperaError {
    /// Check whether this error is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
