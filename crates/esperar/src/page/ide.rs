//! IDE shell page object.

use crate::client::DomClient;
use crate::locator::Locator;
use crate::page::Waitable;
use crate::policy::PollPolicy;
use crate::resilient::ResilientLocator;
use crate::result::EsperaResult;
use async_trait::async_trait;

/// Page object for the IDE application shell
#[derive(Debug, Clone)]
pub struct Ide<C> {
    waits: ResilientLocator<C>,
    policy: PollPolicy,
}

impl<C: DomClient> Ide<C> {
    /// Create the page object over the wait layer, using its default policy
    #[must_use]
    pub fn new(waits: ResilientLocator<C>) -> Self {
        let policy = waits.defaults();
        Self { waits, policy }
    }

    /// Override the poll policy for readiness waits
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn app_shell() -> Locator {
        Locator::css("div#theia-app-shell")
    }

    fn status_bar() -> Locator {
        Locator::css("div#theia-statusBar")
    }

    /// Wait for the IDE shell and status bar to render.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn wait_ide(&self) -> EsperaResult<()> {
        tracing::debug!("ide.wait_ide");
        self.waits.wait_visible(&Self::app_shell(), &self.policy).await?;
        self.waits
            .wait_visible(&Self::status_bar(), &self.policy)
            .await
            .map(|_| ())
    }

    /// Wait for the named workspace's IDE to be up: the shell renders and
    /// the page reports the `namespace/workspace` route.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn wait_workspace_and_ide(
        &self,
        namespace: &str,
        workspace: &str,
    ) -> EsperaResult<()> {
        tracing::debug!(namespace, workspace, "ide.wait_workspace_and_ide");
        self.wait_ide().await?;
        let route = format!("{namespace}/{workspace}");
        self.waits
            .wait_until(
                &format!("page is on workspace route '{route}'"),
                &self.policy,
                || {
                    let route = route.clone();
                    async move {
                        let source = self
                            .waits
                            .client()
                            .get_page_source()
                            .await
                            .map_err(crate::EsperaError::from)?;
                        Ok(source.contains(&route))
                    }
                },
            )
            .await
    }
}

#[async_trait]
impl<C: DomClient> Waitable for Ide<C> {
    async fn wait_ready(&self) -> EsperaResult<()> {
        self.wait_ide().await
    }

    async fn wait_gone(&self) -> EsperaResult<()> {
        self.waits.wait_absent(&Self::app_shell(), &self.policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::MockDomClient;
    use std::sync::Arc;

    fn fixture() -> (Arc<MockDomClient>, Ide<MockDomClient>) {
        let clock = FakeClock::shared();
        let client = Arc::new(MockDomClient::new(clock.clone()));
        let waits = ResilientLocator::with_clock(client.clone(), clock)
            .with_defaults(PollPolicy::new(2000, 200).unwrap());
        let ide = Ide::new(waits);
        (client, ide)
    }

    #[tokio::test]
    async fn test_wait_ide_needs_shell_and_status_bar() {
        let (client, ide) = fixture();
        client.add_element(&Ide::<MockDomClient>::app_shell(), "");
        client.add_element_at(&Ide::<MockDomClient>::status_bar(), "", 400);

        ide.wait_ide().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_workspace_and_ide_checks_route() {
        let (client, ide) = fixture();
        client.add_element(&Ide::<MockDomClient>::app_shell(), "");
        client.add_element(&Ide::<MockDomClient>::status_bar(), "");
        client.set_page_source("<html><base href='/ide/user1/java-web-vertx'/></html>");

        ide.wait_workspace_and_ide("user1", "java-web-vertx")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_workspace_times_out_on_wrong_route() {
        let (client, ide) = fixture();
        client.add_element(&Ide::<MockDomClient>::app_shell(), "");
        client.add_element(&Ide::<MockDomClient>::status_bar(), "");
        client.set_page_source("<html><base href='/dashboard'/></html>");

        let err = ide
            .wait_workspace_and_ide("user1", "java-web-vertx")
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
