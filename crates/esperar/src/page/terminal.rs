//! Terminal panel page object.
//!
//! Drives the tab bar and xterm widgets of the IDE's bottom panel. Tabs are
//! addressed by title; the xterm row containers and their hidden input
//! textareas are addressed by the tab's 1-based document-order index, which
//! is re-resolved through an indexed collection scan because the tab bar
//! mutates while builds and plugins open terminals.

use crate::client::DomClient;
use crate::locator::Locator;
use crate::page::{Clickable, TextReadable, Waitable};
use crate::policy::{PollPolicy, DEFAULT_INDEX_SCAN_RETRIES};
use crate::resilient::ResilientLocator;
use crate::result::EsperaResult;
use async_trait::async_trait;

/// ETX, what xterm receives for a Ctrl+C chord
const CTRL_C: &str = "\u{0003}";

/// Page object for the terminal panel
#[derive(Debug, Clone)]
pub struct Terminal<C> {
    waits: ResilientLocator<C>,
    index_scan_retries: u32,
}

impl<C: DomClient> Terminal<C> {
    const ROWS_XPATH_PREFIX: &'static str = "(//div[contains(@class, 'terminal-container')]//div[contains(@class, 'terminal')]//div[contains(@class, 'xterm-rows')])";

    const TAB_LABELS_XPATH: &'static str = "//div[@id='theia-bottom-content-panel']//li[contains(@id, 'shell-tab-terminal') or contains(@id, 'shell-tab-plugin')]//div[@class='p-TabBar-tabLabel']";

    /// Create the page object over the wait layer
    #[must_use]
    pub fn new(waits: ResilientLocator<C>) -> Self {
        Self {
            waits,
            index_scan_retries: DEFAULT_INDEX_SCAN_RETRIES,
        }
    }

    /// Override how many times an indexed tab scan restarts
    #[must_use]
    pub const fn with_index_scan_retries(mut self, retries: u32) -> Self {
        self.index_scan_retries = retries;
        self
    }

    fn tab_locator(tab_title: &str) -> Locator {
        Locator::css(format!("li[title='{tab_title}']"))
    }

    fn focused_tab_locator(tab_title: &str) -> Locator {
        Locator::css(format!(
            "li[title='{tab_title}'].p-mod-current.theia-mod-active"
        ))
    }

    fn tab_close_icon_locator(tab_title: &str) -> Locator {
        Locator::css(format!(
            "li[title='{tab_title}'] div.p-TabBar-tabCloseIcon"
        ))
    }

    fn rows_locator(terminal_index: usize) -> Locator {
        Locator::xpath(format!("{}[{terminal_index}]", Self::ROWS_XPATH_PREFIX))
    }

    fn input_locator(terminal_index: usize) -> Locator {
        Locator::xpath(format!(
            "(//textarea[@aria-label='Terminal input'])[{terminal_index}]"
        ))
    }

    /// Wait for the titled tab to disappear.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn wait_tab_absence(&self, tab_title: &str, policy: &PollPolicy) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.wait_tab_absence");
        self.waits
            .wait_absent(&Self::tab_locator(tab_title), policy)
            .await
    }

    /// Click the titled tab.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn click_on_tab(&self, tab_title: &str, policy: &PollPolicy) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.click_on_tab");
        self.waits
            .wait_and_click(&Self::tab_locator(tab_title), policy)
            .await
    }

    /// Wait for the titled tab to hold focus.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn wait_tab_focused(&self, tab_title: &str, policy: &PollPolicy) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.wait_tab_focused");
        self.waits
            .wait_visible(&Self::focused_tab_locator(tab_title), policy)
            .await
            .map(|_| ())
    }

    /// Click the titled tab and wait for it to take focus.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn select_tab(&self, tab_title: &str, policy: &PollPolicy) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.select_tab");
        self.click_on_tab(tab_title, policy).await?;
        self.wait_tab_focused(tab_title, policy).await
    }

    /// Click the titled tab's close icon.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn click_on_tab_close_icon(
        &self,
        tab_title: &str,
        policy: &PollPolicy,
    ) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.click_on_tab_close_icon");
        self.waits
            .wait_and_click(&Self::tab_close_icon_locator(tab_title), policy)
            .await
    }

    /// Close the titled tab and wait for it to disappear.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn close_tab(&self, tab_title: &str, policy: &PollPolicy) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.close_tab");
        self.click_on_tab_close_icon(tab_title, policy).await?;
        self.wait_tab_absence(tab_title, policy).await
    }

    /// 1-based document-order index of the first tab whose label contains
    /// `tab_title`.
    ///
    /// # Errors
    ///
    /// [`EsperaError::NotFound`](crate::EsperaError::NotFound) listing the
    /// labels seen on the final scan.
    pub async fn terminal_index(&self, tab_title: &str) -> EsperaResult<usize> {
        self.waits
            .find_indexed_element(
                tab_title,
                &Locator::xpath(Self::TAB_LABELS_XPATH),
                self.index_scan_retries,
            )
            .await
    }

    /// Type into the titled terminal's hidden input textarea.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn type_text(
        &self,
        tab_title: &str,
        text: &str,
        policy: &PollPolicy,
    ) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.type_text");
        let terminal_index = self.terminal_index(tab_title).await?;
        self.waits
            .wait_and_send_keys(&Self::input_locator(terminal_index), text, policy)
            .await
    }

    /// Interrupt the foreground process in the titled terminal (Ctrl+C).
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn reject_process(&self, tab_title: &str, policy: &PollPolicy) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, "terminal.reject_process");
        self.select_tab(tab_title, policy).await?;
        self.type_text(tab_title, CTRL_C, policy).await
    }

    /// Read the titled terminal's visible rows.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn text(&self, tab_title: &str, policy: &PollPolicy) -> EsperaResult<String> {
        tracing::debug!(tab = tab_title, "terminal.text");
        let terminal_index = self.terminal_index(tab_title).await?;
        self.select_tab(tab_title, policy).await?;
        self.waits
            .wait_and_get_text(&Self::rows_locator(terminal_index), policy)
            .await
    }

    /// Wait until the titled terminal's rows contain `expected`.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn wait_text(
        &self,
        tab_title: &str,
        expected: &str,
        policy: &PollPolicy,
    ) -> EsperaResult<()> {
        tracing::debug!(tab = tab_title, expected, "terminal.wait_text");
        let terminal_index = self.terminal_index(tab_title).await?;
        self.select_tab(tab_title, policy).await?;
        let rows = Self::rows_locator(terminal_index);
        self.waits
            .wait_until(
                &format!("terminal '{tab_title}' rows contain '{expected}'"),
                policy,
                || {
                    let rows = rows.clone();
                    async move {
                        let text = self.waits.wait_and_get_text(&rows, policy).await?;
                        Ok(text.contains(expected))
                    }
                },
            )
            .await
    }

    /// Select a tab whose title merely *contains* `tab_title_prefix` and
    /// wait until its rows contain `expected`.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn select_tab_by_prefix_and_wait_text(
        &self,
        tab_title_prefix: &str,
        expected: &str,
        policy: &PollPolicy,
    ) -> EsperaResult<()> {
        tracing::debug!(
            prefix = tab_title_prefix,
            expected,
            "terminal.select_tab_by_prefix_and_wait_text"
        );
        let terminal_index = self.terminal_index(tab_title_prefix).await?;
        let prefixed_tab =
            Locator::xpath(format!("//li[contains(@title, '{tab_title_prefix}')]"));
        self.waits.wait_and_click(&prefixed_tab, policy).await?;
        let rows = Self::rows_locator(terminal_index);
        self.waits
            .wait_until(
                &format!("terminal '{tab_title_prefix}' rows contain '{expected}'"),
                policy,
                || {
                    let rows = rows.clone();
                    async move {
                        let text = self.waits.wait_and_get_text(&rows, policy).await?;
                        Ok(text.contains(expected))
                    }
                },
            )
            .await
    }

    /// Borrow a single tab as a capability-scoped region
    #[must_use]
    pub fn tab(&self, tab_title: impl Into<String>) -> TerminalTab<'_, C> {
        TerminalTab {
            terminal: self,
            title: tab_title.into(),
            policy: self.waits.defaults(),
        }
    }
}

/// One terminal tab, viewed through the capability traits
#[derive(Debug)]
pub struct TerminalTab<'a, C> {
    terminal: &'a Terminal<C>,
    title: String,
    policy: PollPolicy,
}

impl<C: DomClient> TerminalTab<'_, C> {
    /// Override the poll policy used by this tab's capability calls
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The tab title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

#[async_trait]
impl<C: DomClient> Clickable for TerminalTab<'_, C> {
    async fn click(&self) -> EsperaResult<()> {
        self.terminal.click_on_tab(&self.title, &self.policy).await
    }
}

#[async_trait]
impl<C: DomClient> TextReadable for TerminalTab<'_, C> {
    async fn read_text(&self) -> EsperaResult<String> {
        self.terminal.text(&self.title, &self.policy).await
    }
}

#[async_trait]
impl<C: DomClient> Waitable for TerminalTab<'_, C> {
    async fn wait_ready(&self) -> EsperaResult<()> {
        self.terminal.wait_tab_focused(&self.title, &self.policy).await
    }

    async fn wait_gone(&self) -> EsperaResult<()> {
        self.terminal.wait_tab_absence(&self.title, &self.policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::MockDomClient;
    use crate::result::EsperaError;
    use std::sync::Arc;

    struct Fixture {
        client: Arc<MockDomClient>,
        terminal: Terminal<MockDomClient>,
        policy: PollPolicy,
    }

    fn fixture() -> Fixture {
        let clock = FakeClock::shared();
        let client = Arc::new(MockDomClient::new(clock.clone()));
        let waits = ResilientLocator::with_clock(client.clone(), clock);
        Fixture {
            client,
            terminal: Terminal::new(waits),
            policy: PollPolicy::new(2000, 200).unwrap(),
        }
    }

    /// Seed a tab plus its label entry in the tab bar collection.
    fn seed_tab(f: &Fixture, title: &str) -> (u64, u64) {
        let tab = f
            .client
            .add_element(&Terminal::<MockDomClient>::tab_locator(title), title);
        let label = f.client.add_element(
            &Locator::xpath(Terminal::<MockDomClient>::TAB_LABELS_XPATH),
            title,
        );
        (tab, label)
    }

    fn seed_focused(f: &Fixture, title: &str) -> u64 {
        f.client.add_element(
            &Terminal::<MockDomClient>::focused_tab_locator(title),
            title,
        )
    }

    #[tokio::test]
    async fn test_select_tab_clicks_then_waits_for_focus() {
        let f = fixture();
        let (tab_id, _) = seed_tab(&f, "bash");
        seed_focused(&f, "bash");

        f.terminal.select_tab("bash", &f.policy).await.unwrap();
        assert_eq!(f.client.click_count(tab_id), 1);
    }

    #[tokio::test]
    async fn test_close_tab_clicks_icon_and_waits_for_absence() {
        let f = fixture();
        let (tab_id, _) = seed_tab(&f, "gradle");
        let icon_id = f.client.add_element(
            &Terminal::<MockDomClient>::tab_close_icon_locator("gradle"),
            "",
        );
        // closing removes both the icon and the tab
        f.client.remove_element_at(tab_id, 400);
        f.client.remove_element_at(icon_id, 400);

        f.terminal.close_tab("gradle", &f.policy).await.unwrap();
        assert_eq!(f.client.click_count(icon_id), 1);
    }

    #[tokio::test]
    async fn test_terminal_index_is_one_based_first_match() {
        let f = fixture();
        seed_tab(&f, "foo-1");
        seed_tab(&f, "bar-2");
        seed_tab(&f, "foo-3");

        assert_eq!(f.terminal.terminal_index("foo").await.unwrap(), 1);
        assert_eq!(f.terminal.terminal_index("bar").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_terminal_index_miss_lists_tab_titles() {
        let f = fixture();
        seed_tab(&f, "gradle build");
        seed_tab(&f, "maven install");

        let err = f.terminal.terminal_index("bash").await.unwrap_err();
        match err {
            EsperaError::NotFound { candidates, .. } => {
                assert_eq!(candidates, vec!["gradle build", "maven install"]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_type_text_targets_indexed_input() {
        let f = fixture();
        seed_tab(&f, "sh-1");
        seed_tab(&f, "sh-2");
        let input = f.client.add_hidden_element(
            &Terminal::<MockDomClient>::input_locator(2),
            "",
        );

        f.terminal
            .type_text("sh-2", "ls -la\n", &f.policy)
            .await
            .unwrap();
        assert_eq!(f.client.typed_text(), vec![(input, "ls -la\n".to_string())]);
    }

    #[tokio::test]
    async fn test_text_reads_indexed_rows() {
        let f = fixture();
        seed_tab(&f, "bash");
        seed_focused(&f, "bash");
        f.client.add_element(
            &Terminal::<MockDomClient>::rows_locator(1),
            "$ cargo build\n   Compiling",
        );

        let text = f.terminal.text("bash", &f.policy).await.unwrap();
        assert!(text.contains("Compiling"));
    }

    #[tokio::test]
    async fn test_wait_text_polls_until_rows_contain_expected() {
        let f = fixture();
        seed_tab(&f, "bash");
        seed_focused(&f, "bash");
        let rows = f
            .client
            .add_element(&Terminal::<MockDomClient>::rows_locator(1), "$ ");
        f.client.set_text(rows, "$ cargo test\nrunning 12 tests");

        f.terminal
            .wait_text("bash", "running 12 tests", &f.policy)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_text_times_out_when_text_never_arrives() {
        let f = fixture();
        seed_tab(&f, "bash");
        seed_focused(&f, "bash");
        f.client
            .add_element(&Terminal::<MockDomClient>::rows_locator(1), "$ ");

        let err = f
            .terminal
            .wait_text("bash", "never printed", &f.policy)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_select_tab_by_prefix_matches_partial_titles() {
        let f = fixture();
        seed_tab(&f, "task: maven build");
        let prefixed = f.client.add_element(
            &Locator::xpath("//li[contains(@title, 'maven')]"),
            "task: maven build",
        );
        f.client.add_element(
            &Terminal::<MockDomClient>::rows_locator(1),
            "BUILD SUCCESS",
        );

        f.terminal
            .select_tab_by_prefix_and_wait_text("maven", "BUILD SUCCESS", &f.policy)
            .await
            .unwrap();
        assert_eq!(f.client.click_count(prefixed), 1);
    }

    #[tokio::test]
    async fn test_reject_process_sends_ctrl_c() {
        let f = fixture();
        seed_tab(&f, "long-task");
        seed_focused(&f, "long-task");
        let input = f
            .client
            .add_hidden_element(&Terminal::<MockDomClient>::input_locator(1), "");

        f.terminal
            .reject_process("long-task", &f.policy)
            .await
            .unwrap();
        assert_eq!(f.client.typed_text(), vec![(input, CTRL_C.to_string())]);
    }

    #[tokio::test]
    async fn test_capability_traits_on_tab() {
        let f = fixture();
        let (tab_id, _) = seed_tab(&f, "bash");
        seed_focused(&f, "bash");
        f.client
            .add_element(&Terminal::<MockDomClient>::rows_locator(1), "$ echo hi\nhi");

        let tab = f.terminal.tab("bash").with_policy(f.policy);
        tab.click().await.unwrap();
        tab.wait_ready().await.unwrap();
        let text = tab.read_text().await.unwrap();
        assert!(text.contains("hi"));
        assert!(f.client.click_count(tab_id) >= 1);
    }
}
