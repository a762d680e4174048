//! Login form page object.

use crate::client::DomClient;
use crate::locator::Locator;
use crate::page::Waitable;
use crate::policy::PollPolicy;
use crate::resilient::ResilientLocator;
use crate::result::EsperaResult;
use async_trait::async_trait;

/// Page object for the identity provider's login form
#[derive(Debug, Clone)]
pub struct Login<C> {
    waits: ResilientLocator<C>,
    policy: PollPolicy,
}

impl<C: DomClient> Login<C> {
    /// Create the page object over the wait layer, using its default policy
    #[must_use]
    pub fn new(waits: ResilientLocator<C>) -> Self {
        let policy = waits.defaults();
        Self { waits, policy }
    }

    /// Override the poll policy for login steps
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn username_input() -> Locator {
        Locator::css("input#username")
    }

    fn password_input() -> Locator {
        Locator::css("input#password")
    }

    fn login_button() -> Locator {
        Locator::css("input#kc-login")
    }

    /// Wait for the login form to be interactable.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn wait_loaded(&self) -> EsperaResult<()> {
        tracing::debug!("login.wait_loaded");
        self.waits
            .wait_visible(&Self::username_input(), &self.policy)
            .await
            .map(|_| ())
    }

    /// Fill in credentials, submit, and wait for the form to go away.
    ///
    /// # Errors
    ///
    /// Wait-layer failures.
    pub async fn login(&self, username: &str, password: &str) -> EsperaResult<()> {
        tracing::debug!(username, "login.login");
        self.wait_loaded().await?;
        self.waits
            .wait_and_send_keys(&Self::username_input(), username, &self.policy)
            .await?;
        self.waits
            .wait_and_send_keys(&Self::password_input(), password, &self.policy)
            .await?;
        self.waits
            .wait_and_click(&Self::login_button(), &self.policy)
            .await?;
        self.waits
            .wait_absent(&Self::login_button(), &self.policy)
            .await
    }
}

#[async_trait]
impl<C: DomClient> Waitable for Login<C> {
    async fn wait_ready(&self) -> EsperaResult<()> {
        self.wait_loaded().await
    }

    async fn wait_gone(&self) -> EsperaResult<()> {
        self.waits
            .wait_absent(&Self::login_button(), &self.policy)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::MockDomClient;
    use std::sync::Arc;

    fn fixture() -> (Arc<MockDomClient>, Login<MockDomClient>) {
        let clock = FakeClock::shared();
        let client = Arc::new(MockDomClient::new(clock.clone()));
        let waits = ResilientLocator::with_clock(client.clone(), clock)
            .with_defaults(PollPolicy::new(2000, 200).unwrap());
        let login = Login::new(waits);
        (client, login)
    }

    #[tokio::test]
    async fn test_login_fills_credentials_and_submits() {
        let (client, login) = fixture();
        let username = client.add_element(&Login::<MockDomClient>::username_input(), "");
        let password = client.add_element(&Login::<MockDomClient>::password_input(), "");
        let button = client.add_element(&Login::<MockDomClient>::login_button(), "Log In");
        // the form unloads shortly after submit
        client.remove_element_at(button, 600);

        login.login("user1", "hunter2").await.unwrap();

        assert_eq!(
            client.typed_text(),
            vec![
                (username, "user1".to_string()),
                (password, "hunter2".to_string())
            ]
        );
        assert_eq!(client.click_count(button), 1);
    }

    #[tokio::test]
    async fn test_login_times_out_when_form_never_loads() {
        let (_client, login) = fixture();
        let err = login.login("user1", "hunter2").await.unwrap_err();
        assert!(err.is_timeout());
    }
}
