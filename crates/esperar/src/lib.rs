//! Esperar: resilient DOM waits for web-IDE end-to-end tests.
//!
//! Esperar (Spanish: "to wait") turns an unreliable, asynchronously mutating
//! DOM into deterministic wait primitives for test code: wait-for-visibility,
//! wait-for-absence, wait-and-click, wait-and-get-text, indexed collection
//! scans, and a generic condition poller, all parameterized by a timeout +
//! interval policy and driven by an injectable clock.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     ESPERAR Architecture                       │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────┐   ┌──────────────────┐   │
//! │  │ Page      │   │ ResilientLocator │   │ DomClient        │   │
//! │  │ Objects   │──►│ (poll + retry,   │──►│ (CDP via the     │   │
//! │  │ (Terminal,│   │  injectable      │   │  `browser`       │   │
//! │  │  Login,   │   │  clock)          │   │  feature, or the │   │
//! │  │  Ide)     │   │                  │   │  scriptable mock)│   │
//! │  └───────────┘   └──────────────────┘   └──────────────────┘   │
//! │        │                                                       │
//! │        ▼                                                       │
//! │  ┌───────────────────────────────┐                             │
//! │  │ HarnessReporter               │                             │
//! │  │ (screenshot / page source /   │                             │
//! │  │  browser logs on failure)     │                             │
//! │  └───────────────────────────────┘                             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use esperar::{
//!     FakeClock, Locator, MockDomClient, PollPolicy, ResilientLocator,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> esperar::EsperaResult<()> {
//! let clock = FakeClock::shared();
//! let client = Arc::new(MockDomClient::new(clock.clone()));
//! client.add_element(&Locator::css("li[title='bash']"), "bash");
//!
//! let waits = ResilientLocator::with_clock(client, clock);
//! let policy = PollPolicy::new(5_000, 250)?;
//! waits
//!     .wait_visible(&Locator::css("li[title='bash']"), &policy)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod browser;
mod client;
mod clock;
mod config;
mod locator;
mod policy;
mod reporter;
mod resilient;
mod result;

/// Scriptable in-memory DOM client for deterministic tests
pub mod mock;

/// Page objects for the IDE under test
pub mod page;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{Browser, CdpClient};
pub use client::{ClientError, DomClient, ElementHandle, LogEntry, LogLevel};
pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use config::{init_tracing, HarnessConfig, DEFAULT_BASE_URL, DEFAULT_REPORT_DIR};
pub use locator::{Locator, SelectorKind};
pub use mock::MockDomClient;
pub use policy::{
    PollPolicy, DEFAULT_INDEX_SCAN_RETRIES, DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};
pub use reporter::{
    FailureArtifacts, HarnessReporter, ReportSummary, TestRecord, TestStatus,
};
pub use resilient::ResilientLocator;
pub use result::{EsperaError, EsperaResult};
