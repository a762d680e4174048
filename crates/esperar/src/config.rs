//! Environment-driven harness configuration.
//!
//! Every knob has a compiled default, an `ESPERA_*` environment override,
//! and a builder method, so CI tunes deployments without code changes.

use crate::policy::{PollPolicy, DEFAULT_INDEX_SCAN_RETRIES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default IDE base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default report directory for failure artifacts
pub const DEFAULT_REPORT_DIR: &str = "report";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base URL of the IDE under test
    pub base_url: String,
    /// Run the browser headless
    pub headless: bool,
    /// Poll policy applied where tests do not pass an explicit one
    pub default_policy: PollPolicy,
    /// Whole-scan retries for indexed collection lookups
    pub index_scan_retries: u32,
    /// Directory receiving failure artifacts
    pub report_dir: PathBuf,
    /// Login username, when the deployment requires auth
    pub username: Option<String>,
    /// Login password, when the deployment requires auth
    pub password: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            default_policy: PollPolicy::default(),
            index_scan_retries: DEFAULT_INDEX_SCAN_RETRIES,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            username: None,
            password: None,
        }
    }
}

impl HarnessConfig {
    /// Build a configuration from `ESPERA_*` environment variables,
    /// falling back to the compiled defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout_ms = env_parsed("ESPERA_TIMEOUT_MS")
            .unwrap_or(defaults.default_policy.timeout_ms);
        let interval_ms = env_parsed("ESPERA_INTERVAL_MS")
            .unwrap_or(defaults.default_policy.interval_ms)
            .min(timeout_ms);
        Self {
            base_url: env_string("ESPERA_BASE_URL").unwrap_or(defaults.base_url),
            headless: env_parsed("ESPERA_HEADLESS").unwrap_or(defaults.headless),
            default_policy: PollPolicy {
                timeout_ms,
                interval_ms,
            },
            index_scan_retries: env_parsed("ESPERA_INDEX_SCAN_RETRIES")
                .unwrap_or(defaults.index_scan_retries),
            report_dir: env_string("ESPERA_REPORT_DIR")
                .map_or(defaults.report_dir, PathBuf::from),
            username: env_string("ESPERA_USERNAME"),
            password: env_string("ESPERA_PASSWORD"),
        }
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Override the default poll policy
    #[must_use]
    pub const fn with_default_policy(mut self, policy: PollPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Override the indexed-scan retry count
    #[must_use]
    pub const fn with_index_scan_retries(mut self, retries: u32) -> Self {
        self.index_scan_retries = retries;
        self
    }

    /// Override the report directory
    #[must_use]
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Set login credentials
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Multi-line launch banner logged at suite start. Credentials are
    /// reported as set/unset, never echoed.
    #[must_use]
    pub fn launch_banner(&self) -> String {
        format!(
            "################## Launch Information ##################\n\
             \n\
             \x20 ESPERA_BASE_URL: {}\n\
             \x20 ESPERA_HEADLESS: {}\n\
             \x20 ESPERA_TIMEOUT_MS: {}\n\
             \x20 ESPERA_INTERVAL_MS: {}\n\
             \x20 ESPERA_INDEX_SCAN_RETRIES: {}\n\
             \x20 ESPERA_REPORT_DIR: {}\n\
             \x20 ESPERA_USERNAME: {}\n\
             \x20 ESPERA_PASSWORD: {}\n\
             \n\
             ########################################################",
            self.base_url,
            self.headless,
            self.default_policy.timeout_ms,
            self.default_policy.interval_ms,
            self.index_scan_retries,
            self.report_dir.display(),
            set_or_unset(self.username.as_ref()),
            set_or_unset(self.password.as_ref()),
        )
    }
}

/// Install a tracing subscriber honoring `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

fn set_or_unset(value: Option<&String>) -> &'static str {
    if value.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}
