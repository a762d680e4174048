//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an immutable query descriptor identifying zero, one, or
//! many DOM nodes at lookup time. The harness never holds live element
//! references across waits; every poll re-resolves the locator, so a locator
//! stays valid across arbitrary DOM churn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The query language a locator expression is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectorKind {
    /// CSS selector (e.g. `li[title='bash']`)
    Css,
    /// XPath expression (e.g. `//div[@id='theia-bottom-content-panel']//li`)
    XPath,
}

impl SelectorKind {
    /// Short tag used in `Display` output and error messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::XPath => "xpath",
        }
    }
}

/// An immutable DOM query descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    kind: SelectorKind,
    expression: String,
}

impl Locator {
    /// Create a CSS locator
    #[must_use]
    pub fn css(expression: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::Css,
            expression: expression.into(),
        }
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::XPath,
            expression: expression.into(),
        }
    }

    /// The selector kind
    #[must_use]
    pub const fn kind(&self) -> SelectorKind {
        self.kind
    }

    /// The raw selector expression
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Compile to a JavaScript expression resolving the first match.
    ///
    /// Used by the CDP backend, which addresses elements by re-evaluating
    /// queries rather than holding remote object handles.
    #[must_use]
    pub fn to_query(&self) -> String {
        match self.kind {
            SelectorKind::Css => format!("document.querySelector({:?})", self.expression),
            SelectorKind::XPath => format!(
                "document.evaluate({:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                self.expression
            ),
        }
    }

    /// Compile to a JavaScript expression resolving the match at
    /// `index` (0-based, document order).
    #[must_use]
    pub fn to_query_indexed(&self, index: usize) -> String {
        match self.kind {
            SelectorKind::Css => format!(
                "document.querySelectorAll({:?})[{index}]",
                self.expression
            ),
            SelectorKind::XPath => format!(
                "document.evaluate({:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotItem({index})",
                self.expression
            ),
        }
    }

    /// Compile to a JavaScript expression counting all matches.
    #[must_use]
    pub fn to_count_query(&self) -> String {
        match self.kind {
            SelectorKind::Css => {
                format!("document.querySelectorAll({:?}).length", self.expression)
            }
            SelectorKind::XPath => format!(
                "document.evaluate({:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
                self.expression
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.expression)
    }
}
