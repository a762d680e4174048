//! Resilient wait primitives over a [`DomClient`].
//!
//! The application under test mutates the DOM asynchronously; naive
//! single-shot lookups are flaky. [`ResilientLocator`] centralizes the
//! poll-retry contract so every higher-level page interaction inherits the
//! same timeout and cadence semantics without duplicating loops:
//!
//! - element lookups poll until the element is present *and* visible;
//! - composite lookup-then-act sequences restart on stale references,
//!   within the original budget;
//! - an "element missing" client failure means "keep polling"; anything
//!   else (session lost, protocol error) propagates on first occurrence.
//!
//! All primitives are cooperatively suspending and read time through the
//! injected [`Clock`](crate::clock::Clock), so the timeout arithmetic is
//! testable without real delays. Cancellation is timeout-driven only: an
//! expired wait fails deterministically and leaves no background polling.

use crate::client::{DomClient, ElementHandle};
use crate::clock::{SharedClock, SystemClock};
use crate::locator::Locator;
use crate::policy::PollPolicy;
use crate::result::{EsperaError, EsperaResult};
use std::future::Future;
use std::sync::Arc;

/// Retry/poll wrapper over a browser client.
///
/// Cheap to clone; clones share the client and clock.
#[derive(Debug)]
pub struct ResilientLocator<C> {
    client: Arc<C>,
    clock: SharedClock,
    defaults: PollPolicy,
}

impl<C> Clone for ResilientLocator<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            clock: Arc::clone(&self.clock),
            defaults: self.defaults,
        }
    }
}

impl<C: DomClient> ResilientLocator<C> {
    /// Wrap a client, polling against real time
    #[must_use]
    pub fn new(client: Arc<C>) -> Self {
        Self::with_clock(client, SystemClock::shared())
    }

    /// Wrap a client with an explicit time source
    #[must_use]
    pub fn with_clock(client: Arc<C>, clock: SharedClock) -> Self {
        Self {
            client,
            clock,
            defaults: PollPolicy::default(),
        }
    }

    /// Override the default poll policy used by page-object helpers
    #[must_use]
    pub const fn with_defaults(mut self, defaults: PollPolicy) -> Self {
        self.defaults = defaults;
        self
    }

    /// The wrapped client
    #[must_use]
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// The default poll policy
    #[must_use]
    pub const fn defaults(&self) -> PollPolicy {
        self.defaults
    }

    /// Navigate the browser to `url` (single-shot passthrough).
    ///
    /// # Errors
    ///
    /// Client navigation failures.
    pub async fn navigate_to(&self, url: &str) -> EsperaResult<()> {
        tracing::debug!(url, "navigate_to");
        self.client.navigate_to(url).await.map_err(Into::into)
    }

    /// Poll until an element matching `locator` is present and visible.
    ///
    /// Multiple matches are not an error: the first in document order wins.
    ///
    /// # Errors
    ///
    /// [`EsperaError::Timeout`] on budget expiry; non-absence client
    /// failures immediately.
    pub async fn wait_visible(
        &self,
        locator: &Locator,
        policy: &PollPolicy,
    ) -> EsperaResult<ElementHandle> {
        policy.validate()?;
        tracing::debug!(locator = %locator, timeout_ms = policy.timeout_ms, "wait_visible");
        let started = self.clock.now_ms();
        loop {
            if let Some(element) = self.probe_visible(locator).await? {
                return Ok(element);
            }
            self.tick(&locator.to_string(), policy, started).await?;
        }
    }

    /// Poll until no visible element matches `locator`.
    ///
    /// # Errors
    ///
    /// [`EsperaError::Timeout`] if a visible match persists past the
    /// budget; non-absence client failures immediately.
    pub async fn wait_absent(&self, locator: &Locator, policy: &PollPolicy) -> EsperaResult<()> {
        policy.validate()?;
        tracing::debug!(locator = %locator, timeout_ms = policy.timeout_ms, "wait_absent");
        let started = self.clock.now_ms();
        loop {
            if self.probe_visible(locator).await?.is_none() {
                return Ok(());
            }
            self.tick(&locator.to_string(), policy, started).await?;
        }
    }

    /// Wait for visibility, then click.
    ///
    /// A stale reference between lookup and click restarts the whole
    /// sequence within the same overall budget.
    ///
    /// # Errors
    ///
    /// [`EsperaError::Timeout`] on budget expiry; non-retryable client
    /// failures immediately.
    pub async fn wait_and_click(&self, locator: &Locator, policy: &PollPolicy) -> EsperaResult<()> {
        policy.validate()?;
        tracing::debug!(locator = %locator, timeout_ms = policy.timeout_ms, "wait_and_click");
        let started = self.clock.now_ms();
        loop {
            let element = self.wait_visible_within(locator, policy, started).await?;
            match self.client.click(&element).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_stale() || e.is_absence() => {
                    tracing::debug!(locator = %locator, "stale click, rescanning");
                }
                Err(e) => return Err(e.into()),
            }
            self.tick(&locator.to_string(), policy, started).await?;
        }
    }

    /// Wait for visibility, then read text content.
    ///
    /// # Errors
    ///
    /// As [`ResilientLocator::wait_and_click`].
    pub async fn wait_and_get_text(
        &self,
        locator: &Locator,
        policy: &PollPolicy,
    ) -> EsperaResult<String> {
        policy.validate()?;
        tracing::debug!(locator = %locator, timeout_ms = policy.timeout_ms, "wait_and_get_text");
        let started = self.clock.now_ms();
        loop {
            let element = self.wait_visible_within(locator, policy, started).await?;
            match self.client.get_text(&element).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_stale() || e.is_absence() => {}
                Err(e) => return Err(e.into()),
            }
            self.tick(&locator.to_string(), policy, started).await?;
        }
    }

    /// Wait for *presence* (visibility not required), then type.
    ///
    /// Terminal input goes through an off-screen textarea, so this
    /// deliberately skips the visibility check `wait_and_click` performs.
    ///
    /// # Errors
    ///
    /// As [`ResilientLocator::wait_and_click`].
    pub async fn wait_and_send_keys(
        &self,
        locator: &Locator,
        text: &str,
        policy: &PollPolicy,
    ) -> EsperaResult<()> {
        policy.validate()?;
        tracing::debug!(locator = %locator, "wait_and_send_keys");
        let started = self.clock.now_ms();
        loop {
            match self.client.find_element(locator).await {
                Ok(element) => match self.client.send_keys(&element, text).await {
                    Ok(()) => return Ok(()),
                    Err(e) if e.is_stale() || e.is_absence() => {}
                    Err(e) => return Err(e.into()),
                },
                Err(e) if e.is_absence() => {}
                Err(e) => return Err(e.into()),
            }
            self.tick(&locator.to_string(), policy, started).await?;
        }
    }

    /// Poll until at least one element matches; return all matches in
    /// document order.
    ///
    /// # Errors
    ///
    /// [`EsperaError::Timeout`] on budget expiry; non-absence client
    /// failures immediately.
    pub async fn wait_all_present(
        &self,
        locator: &Locator,
        policy: &PollPolicy,
    ) -> EsperaResult<Vec<ElementHandle>> {
        policy.validate()?;
        tracing::debug!(locator = %locator, timeout_ms = policy.timeout_ms, "wait_all_present");
        let started = self.clock.now_ms();
        loop {
            match self.client.find_elements(locator).await {
                Ok(elements) if !elements.is_empty() => return Ok(elements),
                Ok(_) => {}
                Err(e) if e.is_absence() => {}
                Err(e) => return Err(e.into()),
            }
            self.tick(&locator.to_string(), policy, started).await?;
        }
    }

    /// Poll a generic predicate until it reports true.
    ///
    /// An evaluation failing with the "no such element" condition counts
    /// as "not yet satisfied"; any other error propagates immediately
    /// without consuming the budget.
    ///
    /// # Errors
    ///
    /// [`EsperaError::Timeout`] on budget expiry; non-absence failures
    /// from the predicate on first occurrence.
    pub async fn wait_until<F, Fut>(
        &self,
        description: &str,
        policy: &PollPolicy,
        mut predicate: F,
    ) -> EsperaResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EsperaResult<bool>>,
    {
        policy.validate()?;
        tracing::debug!(description, timeout_ms = policy.timeout_ms, "wait_until");
        let started = self.clock.now_ms();
        loop {
            match predicate().await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(EsperaError::Client(e)) if e.is_absence() => {}
                Err(e) => return Err(e),
            }
            self.tick(description, policy, started).await?;
        }
    }

    /// Scan a collection of sibling elements for the first whose text
    /// contains `searched`; return its 1-based document-order index.
    ///
    /// The whole scan retries up to `retries` times to absorb races where
    /// the collection mutates between the query and the per-item text
    /// reads (a read hitting a removed element restarts the scan).
    ///
    /// # Errors
    ///
    /// [`EsperaError::NotFound`] listing the candidate texts seen on the
    /// final attempt; non-retryable client failures immediately.
    pub async fn find_indexed_element(
        &self,
        searched: &str,
        collection: &Locator,
        retries: u32,
    ) -> EsperaResult<usize> {
        tracing::debug!(searched, collection = %collection, retries, "find_indexed_element");
        let mut last_miss = None;
        for _ in 0..retries.max(1) {
            match self.scan_collection(searched, collection).await {
                Ok(index) => return Ok(index),
                Err(miss @ EsperaError::NotFound { .. }) => last_miss = Some(miss),
                Err(EsperaError::Client(e)) if e.is_absence() || e.is_stale() => {}
                Err(e) => return Err(e),
            }
        }
        Err(last_miss.unwrap_or_else(|| EsperaError::NotFound {
            searched: searched.to_string(),
            candidates: Vec::new(),
        }))
    }

    /// One scan pass over the collection.
    async fn scan_collection(&self, searched: &str, collection: &Locator) -> EsperaResult<usize> {
        let elements = self.client.find_elements(collection).await?;
        let mut candidates = Vec::with_capacity(elements.len());
        for (position, element) in elements.iter().enumerate() {
            let text = self.client.get_text(element).await?;
            if text.contains(searched) {
                tracing::debug!(index = position + 1, text = %text, "collection match");
                return Ok(position + 1);
            }
            candidates.push(text);
        }
        Err(EsperaError::NotFound {
            searched: searched.to_string(),
            candidates,
        })
    }

    /// Single visibility probe: `Ok(Some)` visible match, `Ok(None)` keep
    /// polling, `Err` give up.
    async fn probe_visible(&self, locator: &Locator) -> EsperaResult<Option<ElementHandle>> {
        match self.client.find_element(locator).await {
            Ok(element) => match self.client.is_displayed(&element).await {
                Ok(true) => Ok(Some(element)),
                Ok(false) => Ok(None),
                // removed between lookup and the visibility read
                Err(e) if e.is_stale() || e.is_absence() => Ok(None),
                Err(e) => Err(e.into()),
            },
            Err(e) if e.is_absence() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Inner visibility wait for composite actions: polls with whatever is
    /// left of the outer budget and reports timeouts against the overall
    /// elapsed time.
    async fn wait_visible_within(
        &self,
        locator: &Locator,
        policy: &PollPolicy,
        started_ms: u64,
    ) -> EsperaResult<ElementHandle> {
        let elapsed = self.clock.now_ms().saturating_sub(started_ms);
        let inner = policy.remaining(elapsed);
        match self.wait_visible(locator, &inner).await {
            Ok(element) => Ok(element),
            Err(EsperaError::Timeout { subject, .. }) => Err(EsperaError::Timeout {
                subject,
                timeout_ms: policy.timeout_ms,
                elapsed_ms: self.clock.now_ms().saturating_sub(started_ms),
            }),
            Err(e) => Err(e),
        }
    }

    /// Shared budget check + sleep between polls.
    async fn tick(&self, subject: &str, policy: &PollPolicy, started_ms: u64) -> EsperaResult<()> {
        let elapsed = self.clock.now_ms().saturating_sub(started_ms);
        if elapsed >= policy.timeout_ms {
            return Err(EsperaError::Timeout {
                subject: subject.to_string(),
                timeout_ms: policy.timeout_ms,
                elapsed_ms: elapsed,
            });
        }
        self.clock.sleep(policy.interval()).await;
        Ok(())
    }
}
