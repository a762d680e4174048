//! Scriptable in-memory DOM client.
//!
//! Backs deterministic tests of the wait layer and page objects: elements
//! are scheduled against the injected [`Clock`](crate::clock::Clock)
//! (appear at, removed at), interactions can be made to fail with stale
//! references a set number of times, and the artifact surface (screenshot,
//! page source, browser logs) returns canned values.
//!
//! Document order is insertion order.

use crate::client::{ClientError, DomClient, ElementHandle, LogEntry};
use crate::clock::SharedClock;
use crate::locator::Locator;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug)]
struct MockElement {
    id: u64,
    locator: Locator,
    text: String,
    displayed: bool,
    appears_at_ms: u64,
    removed_at_ms: Option<u64>,
    stale_interactions: u32,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    elements: Vec<MockElement>,
    clicks: Vec<u64>,
    typed: Vec<(u64, String)>,
    navigations: Vec<String>,
    screenshot_base64: String,
    page_source: String,
    browser_logs: Vec<LogEntry>,
    fail_next: Option<ClientError>,
}

/// Scriptable [`DomClient`] for tests
#[derive(Debug)]
pub struct MockDomClient {
    clock: SharedClock,
    state: Mutex<MockState>,
}

impl MockDomClient {
    /// Create a mock client reading time from `clock`
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(MockState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add a visible element present from time zero; returns its id
    pub fn add_element(&self, locator: &Locator, text: impl Into<String>) -> u64 {
        self.add_element_at(locator, text, 0)
    }

    /// Add a visible element that appears at `appears_at_ms`; returns its id
    pub fn add_element_at(
        &self,
        locator: &Locator,
        text: impl Into<String>,
        appears_at_ms: u64,
    ) -> u64 {
        self.insert(locator, text.into(), true, appears_at_ms)
    }

    /// Add an element that is present but not rendered visible
    pub fn add_hidden_element(&self, locator: &Locator, text: impl Into<String>) -> u64 {
        self.insert_hidden(locator, text.into())
    }

    fn insert(&self, locator: &Locator, text: String, displayed: bool, appears_at_ms: u64) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.elements.push(MockElement {
            id,
            locator: locator.clone(),
            text,
            displayed,
            appears_at_ms,
            removed_at_ms: None,
            stale_interactions: 0,
        });
        id
    }

    fn insert_hidden(&self, locator: &Locator, text: String) -> u64 {
        let id = self.insert(locator, text, true, 0);
        self.set_displayed(id, false);
        id
    }

    /// Remove an element as of the current clock time
    pub fn remove_element(&self, id: u64) {
        let now = self.clock.now_ms();
        self.remove_element_at(id, now);
    }

    /// Schedule an element's removal at `removed_at_ms`
    pub fn remove_element_at(&self, id: u64, removed_at_ms: u64) {
        let mut state = self.lock();
        if let Some(element) = state.elements.iter_mut().find(|e| e.id == id) {
            element.removed_at_ms = Some(removed_at_ms);
        }
    }

    /// Toggle an element's visibility
    pub fn set_displayed(&self, id: u64, displayed: bool) {
        let mut state = self.lock();
        if let Some(element) = state.elements.iter_mut().find(|e| e.id == id) {
            element.displayed = displayed;
        }
    }

    /// Update an element's text content
    pub fn set_text(&self, id: u64, text: impl Into<String>) {
        let mut state = self.lock();
        if let Some(element) = state.elements.iter_mut().find(|e| e.id == id) {
            element.text = text.into();
        }
    }

    /// Make the next `count` interactions with this element fail stale
    pub fn fail_interactions_with_stale(&self, id: u64, count: u32) {
        let mut state = self.lock();
        if let Some(element) = state.elements.iter_mut().find(|e| e.id == id) {
            element.stale_interactions = count;
        }
    }

    /// Make the next DOM call fail with `error`, once
    pub fn fail_next_with(&self, error: ClientError) {
        self.lock().fail_next = Some(error);
    }

    /// Number of successful clicks delivered to element `id`
    #[must_use]
    pub fn click_count(&self, id: u64) -> usize {
        self.lock().clicks.iter().filter(|&&c| c == id).count()
    }

    /// All text typed so far, as `(element id, text)` pairs
    #[must_use]
    pub fn typed_text(&self) -> Vec<(u64, String)> {
        self.lock().typed.clone()
    }

    /// URLs navigated to, in order
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Set the canned base64 screenshot payload
    pub fn set_screenshot_base64(&self, data: impl Into<String>) {
        self.lock().screenshot_base64 = data.into();
    }

    /// Set the canned page source
    pub fn set_page_source(&self, html: impl Into<String>) {
        self.lock().page_source = html.into();
    }

    /// Append a canned browser console entry
    pub fn push_browser_log(&self, entry: LogEntry) {
        self.lock().browser_logs.push(entry);
    }

    fn present(&self, element: &MockElement) -> bool {
        let now = self.clock.now_ms();
        now >= element.appears_at_ms && element.removed_at_ms.is_none_or(|gone| now < gone)
    }

    fn take_injected_failure(&self) -> Option<ClientError> {
        self.lock().fail_next.take()
    }

    /// Run `op` against a live element. `consume_stale` is set for
    /// interactions (click, type, read); visibility probes only observe
    /// real presence, so a scheduled stale failure hits the action that
    /// follows the probe, the way a DOM swap between lookup and act does.
    fn with_live_element<T>(
        &self,
        handle: &ElementHandle,
        consume_stale: bool,
        op: impl FnOnce(&mut MockElement) -> T,
    ) -> Result<T, ClientError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        let now = self.clock.now_ms();
        let mut state = self.lock();
        let Some(element) = state.elements.iter_mut().find(|e| e.id == handle.raw_id) else {
            return Err(ClientError::StaleElement {
                selector: handle.selector.clone(),
            });
        };
        let present =
            now >= element.appears_at_ms && element.removed_at_ms.is_none_or(|gone| now < gone);
        if !present {
            return Err(ClientError::StaleElement {
                selector: handle.selector.clone(),
            });
        }
        if consume_stale && element.stale_interactions > 0 {
            element.stale_interactions -= 1;
            return Err(ClientError::StaleElement {
                selector: handle.selector.clone(),
            });
        }
        Ok(op(element))
    }
}

#[async_trait]
impl DomClient for MockDomClient {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, ClientError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        let state = self.lock();
        state
            .elements
            .iter()
            .filter(|e| e.locator == *locator)
            .find(|e| self.present(e))
            .map(|e| ElementHandle::new(e.id, locator.to_string()))
            .ok_or_else(|| ClientError::NoSuchElement {
                selector: locator.to_string(),
            })
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, ClientError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        let state = self.lock();
        Ok(state
            .elements
            .iter()
            .filter(|e| e.locator == *locator && self.present(e))
            .map(|e| ElementHandle::new(e.id, locator.to_string()))
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), ClientError> {
        let id = self.with_live_element(element, true, |e| e.id)?;
        self.lock().clicks.push(id);
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), ClientError> {
        let id = self.with_live_element(element, true, |e| e.id)?;
        self.lock().typed.push((id, text.to_string()));
        Ok(())
    }

    async fn get_text(&self, element: &ElementHandle) -> Result<String, ClientError> {
        self.with_live_element(element, true, |e| e.text.clone())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, ClientError> {
        self.with_live_element(element, false, |e| e.displayed)
    }

    async fn navigate_to(&self, url: &str) -> Result<(), ClientError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        self.lock().navigations.push(url.to_string());
        Ok(())
    }

    async fn take_screenshot(&self) -> Result<String, ClientError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        Ok(self.lock().screenshot_base64.clone())
    }

    async fn get_page_source(&self) -> Result<String, ClientError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        Ok(self.lock().page_source.clone())
    }

    async fn get_browser_logs(&self) -> Result<Vec<LogEntry>, ClientError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        Ok(std::mem::take(&mut self.lock().browser_logs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LogLevel;
    use crate::clock::FakeClock;
    use std::sync::Arc;

    fn mock() -> (Arc<FakeClock>, MockDomClient) {
        let clock = FakeClock::shared();
        let client = MockDomClient::new(clock.clone());
        (clock, client)
    }

    #[tokio::test]
    async fn test_find_element_absent_then_present() {
        let (clock, client) = mock();
        let tab = Locator::css("li[title='bash']");
        client.add_element_at(&tab, "bash", 500);

        let err = client.find_element(&tab).await.unwrap_err();
        assert!(err.is_absence());

        clock.advance_ms(500);
        let handle = client.find_element(&tab).await.unwrap();
        assert_eq!(handle.selector, tab.to_string());
    }

    #[tokio::test]
    async fn test_removed_element_goes_stale() {
        let (clock, client) = mock();
        let tab = Locator::css("li[title='bash']");
        let id = client.add_element(&tab, "bash");

        let handle = client.find_element(&tab).await.unwrap();
        clock.advance_ms(100);
        client.remove_element(id);

        let err = client.get_text(&handle).await.unwrap_err();
        assert!(err.is_stale());
        assert!(client.find_element(&tab).await.unwrap_err().is_absence());
    }

    #[tokio::test]
    async fn test_document_order_is_insertion_order() {
        let (_clock, client) = mock();
        let tabs = Locator::xpath("//li");
        client.add_element(&tabs, "first");
        client.add_element(&tabs, "second");

        let handles = client.find_elements(&tabs).await.unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(client.get_text(&handles[0]).await.unwrap(), "first");
        assert_eq!(client.get_text(&handles[1]).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_stale_interaction_injection_decrements() {
        let (_clock, client) = mock();
        let button = Locator::css("button");
        let id = client.add_element(&button, "ok");
        client.fail_interactions_with_stale(id, 1);

        let handle = client.find_element(&button).await.unwrap();
        assert!(client.click(&handle).await.unwrap_err().is_stale());
        client.click(&handle).await.unwrap();
        assert_eq!(client.click_count(id), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let (_clock, client) = mock();
        let button = Locator::css("button");
        client.add_element(&button, "ok");
        client.fail_next_with(ClientError::SessionLost {
            message: "gone".to_string(),
        });

        assert!(matches!(
            client.find_element(&button).await,
            Err(ClientError::SessionLost { .. })
        ));
        assert!(client.find_element(&button).await.is_ok());
    }

    #[tokio::test]
    async fn test_artifact_surface() {
        let (_clock, client) = mock();
        client.set_screenshot_base64("aGVsbG8=");
        client.set_page_source("<html></html>");
        client.push_browser_log(LogEntry::new(LogLevel::Info, "browser", "ready"));

        assert_eq!(client.take_screenshot().await.unwrap(), "aGVsbG8=");
        assert_eq!(client.get_page_source().await.unwrap(), "<html></html>");
        assert_eq!(client.get_browser_logs().await.unwrap().len(), 1);
        // logs drain on read
        assert!(client.get_browser_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hidden_element_present_but_not_displayed() {
        let (_clock, client) = mock();
        let textarea = Locator::xpath("//textarea[@aria-label='Terminal input']");
        client.add_hidden_element(&textarea, "");

        let handle = client.find_element(&textarea).await.unwrap();
        assert!(!client.is_displayed(&handle).await.unwrap());
    }
}
