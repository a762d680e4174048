//! The browser client contract.
//!
//! Everything the harness knows about a browser goes through [`DomClient`]:
//! single-shot, unretried queries and commands against the live DOM. The
//! resilient wait layer owns all retry semantics; a client implementation
//! reports exactly what it saw and classifies failures through
//! [`ClientError`] so the wait layer can tell "keep polling" from "give up
//! now".

use crate::locator::Locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by a [`DomClient`] implementation.
///
/// Only [`ClientError::NoSuchElement`] is retryable by wait loops;
/// [`ClientError::StaleElement`] restarts composite lookup-then-act
/// sequences; everything else propagates immediately since retrying
/// cannot help.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// No element currently matches the locator
    #[error("no such element: {selector}")]
    NoSuchElement {
        /// Locator display form
        selector: String,
    },

    /// A previously resolved element reference was invalidated by DOM mutation
    #[error("stale element reference: {selector}")]
    StaleElement {
        /// Locator display form of the dead reference
        selector: String,
    },

    /// The browser session is gone (crashed, quit, disconnected)
    #[error("browser session lost: {message}")]
    SessionLost {
        /// Underlying failure description
        message: String,
    },

    /// Any other protocol-level failure
    #[error("browser client error: {message}")]
    Protocol {
        /// Underlying failure description
        message: String,
    },
}

impl ClientError {
    /// True for the "element missing" condition wait loops absorb
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(self, Self::NoSuchElement { .. })
    }

    /// True when a resolved reference died under us
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement { .. })
    }
}

/// An opaque reference to a resolved DOM element.
///
/// Valid only until the next DOM mutation that removes or replaces the
/// node; afterwards any operation on it fails with
/// [`ClientError::StaleElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Client-assigned reference id
    pub raw_id: u64,
    /// Display form of the locator that resolved this element
    pub selector: String,
}

impl ElementHandle {
    /// Create a handle
    #[must_use]
    pub fn new(raw_id: u64, selector: impl Into<String>) -> Self {
        Self {
            raw_id,
            selector: selector.into(),
        }
    }
}

/// Severity of a captured browser console entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug chatter
    Debug,
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Severe,
}

impl LogLevel {
    /// Uppercase wire form, matching WebDriver log levels
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Severe => "SEVERE",
        }
    }
}

/// One captured browser console entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Log source kind (e.g. `browser`, `console-api`)
    pub kind: String,
    /// Message text
    pub message: String,
}

impl LogEntry {
    /// Create an entry
    #[must_use]
    pub fn new(level: LogLevel, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Quoted artifact line: `"level" "kind" "message"`
    #[must_use]
    pub fn to_artifact_line(&self) -> String {
        format!(
            "\"{}\" \"{}\" \"{}\"",
            self.level.as_str(),
            self.kind,
            self.message
        )
    }
}

/// Single-shot DOM query/command surface implemented per backend.
///
/// All calls are unretried; element lookups return what the DOM holds at
/// that instant. Multiple matches are not an error anywhere: the first
/// element in document order is returned where one is expected.
#[async_trait]
pub trait DomClient: Send + Sync {
    /// Resolve the first element matching `locator`, in document order.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoSuchElement`] when nothing matches.
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, ClientError>;

    /// Resolve all elements matching `locator`, in document order.
    /// An empty result is `Ok(vec![])`, not an error.
    ///
    /// # Errors
    ///
    /// Backend failures other than absence.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, ClientError>;

    /// Click an element.
    ///
    /// # Errors
    ///
    /// [`ClientError::StaleElement`] when the reference died.
    async fn click(&self, element: &ElementHandle) -> Result<(), ClientError>;

    /// Type text into an element.
    ///
    /// # Errors
    ///
    /// [`ClientError::StaleElement`] when the reference died.
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), ClientError>;

    /// Read an element's text content.
    ///
    /// # Errors
    ///
    /// [`ClientError::StaleElement`] when the reference died.
    async fn get_text(&self, element: &ElementHandle) -> Result<String, ClientError>;

    /// Whether the element is currently rendered visible.
    ///
    /// # Errors
    ///
    /// [`ClientError::StaleElement`] when the reference died.
    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, ClientError>;

    /// Navigate the browser to `url`.
    ///
    /// # Errors
    ///
    /// Backend navigation failures.
    async fn navigate_to(&self, url: &str) -> Result<(), ClientError>;

    /// Capture a screenshot as base64-encoded PNG.
    ///
    /// # Errors
    ///
    /// Backend capture failures.
    async fn take_screenshot(&self) -> Result<String, ClientError>;

    /// Current page source as HTML text.
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn get_page_source(&self) -> Result<String, ClientError>;

    /// Drain captured browser console entries.
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn get_browser_logs(&self) -> Result<Vec<LogEntry>, ClientError>;
}
