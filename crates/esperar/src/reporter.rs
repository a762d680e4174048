//! Suite lifecycle reporting and failure artifact capture.
//!
//! The reporter collects per-test results and, for every failure, asks the
//! browser client for its three diagnostics and writes them under
//! `<report_dir>/<full_title>/`:
//!
//! - `screenshot-<title>.png` — decoded from the client's base64 capture
//! - `pagesource-<title>.html` — UTF-8 page source
//! - `browserlogs-<title>.txt` — one `"level" "type" "message"` line per
//!   console entry
//!
//! Whitespace in titles becomes `_` so every artifact path is shell-safe.

use crate::client::DomClient;
use crate::config::HarnessConfig;
use crate::result::{EsperaError, EsperaResult};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Individual test result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    /// Test name
    pub name: String,
    /// Test status
    pub status: TestStatus,
    /// Duration of test execution
    pub duration: Duration,
    /// Error message if failed
    pub error: Option<String>,
}

impl TestRecord {
    /// Create a passing test record
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            duration,
            error: None,
        }
    }

    /// Create a failing test record
    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            duration,
            error: Some(error.into()),
        }
    }

    /// Create a skipped test record
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Skipped,
            duration: Duration::ZERO,
            error: None,
        }
    }
}

/// Paths of the three artifacts written for one failed test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureArtifacts {
    /// PNG screenshot path
    pub screenshot: PathBuf,
    /// HTML page source path
    pub page_source: PathBuf,
    /// Browser console log path
    pub browser_logs: PathBuf,
}

/// Aggregated suite counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Total recorded tests
    pub total: usize,
    /// Passed tests
    pub passed: usize,
    /// Failed tests
    pub failed: usize,
    /// Skipped tests
    pub skipped: usize,
}

impl ReportSummary {
    /// True when nothing failed
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Suite reporter with failure artifact capture
#[derive(Debug)]
pub struct HarnessReporter {
    report_dir: PathBuf,
    records: Vec<TestRecord>,
}

impl HarnessReporter {
    /// Create a reporter writing under `report_dir`
    #[must_use]
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            records: Vec::new(),
        }
    }

    /// The artifact root
    #[must_use]
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Start the suite: log the launch banner and clear stale artifacts.
    ///
    /// # Errors
    ///
    /// I/O failures removing the previous report directory.
    pub fn suite_start(&mut self, config: &HarnessConfig) -> EsperaResult<()> {
        tracing::info!("\n{}", config.launch_banner());
        self.records.clear();
        if self.report_dir.exists() {
            std::fs::remove_dir_all(&self.report_dir)?;
        }
        Ok(())
    }

    /// Record a test result
    pub fn record(&mut self, record: TestRecord) {
        match record.status {
            TestStatus::Passed => {
                tracing::info!(test = %record.name, duration_ms = record.duration.as_millis() as u64, "test passed");
            }
            TestStatus::Failed => {
                tracing::warn!(test = %record.name, error = record.error.as_deref().unwrap_or(""), "test failed");
            }
            TestStatus::Skipped => {
                tracing::info!(test = %record.name, "test skipped");
            }
        }
        self.records.push(record);
    }

    /// Recorded results so far
    #[must_use]
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Aggregate counts
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            total: self.records.len(),
            ..ReportSummary::default()
        };
        for record in &self.records {
            match record.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Capture screenshot, page source, and browser logs for a failed test.
    ///
    /// `full_title` names the per-test directory; `title` names the files.
    ///
    /// # Errors
    ///
    /// Client failures fetching diagnostics, base64 decode failures, I/O
    /// failures writing artifacts.
    pub async fn capture_failure<C: DomClient>(
        &self,
        client: &C,
        full_title: &str,
        title: &str,
    ) -> EsperaResult<FailureArtifacts> {
        let test_dir = self.report_dir.join(sanitize_title(full_title));
        std::fs::create_dir_all(&test_dir)?;
        let title = sanitize_title(title);

        let screenshot = test_dir.join(format!("screenshot-{title}.png"));
        let encoded = client.take_screenshot().await?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| EsperaError::Artifact {
                message: format!("screenshot is not valid base64: {e}"),
            })?;
        std::fs::write(&screenshot, png)?;

        let page_source = test_dir.join(format!("pagesource-{title}.html"));
        std::fs::write(&page_source, client.get_page_source().await?)?;

        let browser_logs = test_dir.join(format!("browserlogs-{title}.txt"));
        let mut lines = String::new();
        for entry in client.get_browser_logs().await? {
            lines.push_str(&entry.to_artifact_line());
            lines.push('\n');
        }
        std::fs::write(&browser_logs, lines)?;

        tracing::info!(dir = %test_dir.display(), "failure artifacts written");
        Ok(FailureArtifacts {
            screenshot,
            page_source,
            browser_logs,
        })
    }

    /// Record an outcome and, on failure, capture artifacts.
    ///
    /// # Errors
    ///
    /// Artifact capture failures; the record itself is always kept.
    pub async fn record_outcome<C: DomClient>(
        &mut self,
        client: &C,
        full_title: &str,
        title: &str,
        duration: Duration,
        outcome: &EsperaResult<()>,
    ) -> EsperaResult<Option<FailureArtifacts>> {
        match outcome {
            Ok(()) => {
                self.record(TestRecord::passed(title, duration));
                Ok(None)
            }
            Err(error) => {
                self.record(TestRecord::failed(title, duration, error.to_string()));
                let artifacts = self.capture_failure(client, full_title, title).await?;
                Ok(Some(artifacts))
            }
        }
    }
}

/// Whitespace runs become single underscores
fn sanitize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LogEntry, LogLevel};
    use crate::clock::FakeClock;
    use crate::mock::MockDomClient;
    use crate::result::EsperaError;

    fn mock_client() -> MockDomClient {
        MockDomClient::new(FakeClock::shared())
    }

    mod record_tests {
        use super::*;

        #[test]
        fn test_summary_counts() {
            let mut reporter = HarnessReporter::new("unused");
            reporter.record(TestRecord::passed("a", Duration::from_millis(10)));
            reporter.record(TestRecord::failed("b", Duration::from_millis(20), "boom"));
            reporter.record(TestRecord::skipped("c"));

            let summary = reporter.summary();
            assert_eq!(summary.total, 3);
            assert_eq!(summary.passed, 1);
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.skipped, 1);
            assert!(!summary.all_passed());
        }

        #[test]
        fn test_statuses() {
            assert!(TestStatus::Passed.is_passed());
            assert!(TestStatus::Failed.is_failed());
            assert!(!TestStatus::Skipped.is_failed());
        }
    }

    mod sanitize_tests {
        use super::*;

        #[test]
        fn test_whitespace_becomes_underscores() {
            assert_eq!(sanitize_title("Wait terminal tab"), "Wait_terminal_tab");
            assert_eq!(sanitize_title("a  b\tc"), "a_b_c");
            assert_eq!(sanitize_title("plain"), "plain");
        }
    }

    mod capture_tests {
        use super::*;

        // "esperar" PNG stand-in
        const SCREENSHOT_B64: &str = "ZXNwZXJhcg==";

        #[tokio::test]
        async fn test_capture_writes_three_artifacts() {
            let dir = tempfile::tempdir().unwrap();
            let reporter = HarnessReporter::new(dir.path().join("report"));
            let client = mock_client();
            client.set_screenshot_base64(SCREENSHOT_B64);
            client.set_page_source("<html><body>broken</body></html>");
            client.push_browser_log(LogEntry::new(LogLevel::Severe, "browser", "boom"));
            client.push_browser_log(LogEntry::new(LogLevel::Info, "console-api", "last words"));

            let artifacts = reporter
                .capture_failure(&client, "Terminal suite Close tab", "Close tab")
                .await
                .unwrap();

            assert!(artifacts
                .screenshot
                .ends_with("Terminal_suite_Close_tab/screenshot-Close_tab.png"));
            assert_eq!(std::fs::read(&artifacts.screenshot).unwrap(), b"esperar");
            assert_eq!(
                std::fs::read_to_string(&artifacts.page_source).unwrap(),
                "<html><body>broken</body></html>"
            );
            assert_eq!(
                std::fs::read_to_string(&artifacts.browser_logs).unwrap(),
                "\"SEVERE\" \"browser\" \"boom\"\n\"INFO\" \"console-api\" \"last words\"\n"
            );
        }

        #[tokio::test]
        async fn test_capture_rejects_bad_base64() {
            let dir = tempfile::tempdir().unwrap();
            let reporter = HarnessReporter::new(dir.path().join("report"));
            let client = mock_client();
            client.set_screenshot_base64("not base64 at all!!!");

            let err = reporter
                .capture_failure(&client, "suite", "test")
                .await
                .unwrap_err();
            assert!(matches!(err, EsperaError::Artifact { .. }));
        }

        #[tokio::test]
        async fn test_record_outcome_captures_only_on_failure() {
            let dir = tempfile::tempdir().unwrap();
            let mut reporter = HarnessReporter::new(dir.path().join("report"));
            let client = mock_client();
            client.set_screenshot_base64(SCREENSHOT_B64);

            let none = reporter
                .record_outcome(
                    &client,
                    "suite ok",
                    "ok",
                    Duration::from_millis(5),
                    &Ok(()),
                )
                .await
                .unwrap();
            assert!(none.is_none());

            let failure: EsperaResult<()> = Err(EsperaError::Timeout {
                subject: "css:#x".to_string(),
                timeout_ms: 100,
                elapsed_ms: 120,
            });
            let some = reporter
                .record_outcome(
                    &client,
                    "suite broken",
                    "broken",
                    Duration::from_millis(120),
                    &failure,
                )
                .await
                .unwrap();
            assert!(some.is_some());

            let summary = reporter.summary();
            assert_eq!(summary.passed, 1);
            assert_eq!(summary.failed, 1);
            let failed = reporter
                .records()
                .iter()
                .find(|r| r.status.is_failed())
                .unwrap();
            assert!(failed.error.as_deref().unwrap().contains("timed out"));
        }
    }

    mod suite_start_tests {
        use super::*;
        use crate::config::HarnessConfig;

        #[test]
        fn test_suite_start_clears_previous_artifacts() {
            let dir = tempfile::tempdir().unwrap();
            let report_dir = dir.path().join("report");
            std::fs::create_dir_all(report_dir.join("old_test")).unwrap();
            std::fs::write(report_dir.join("old_test/screenshot-x.png"), b"stale").unwrap();

            let mut reporter = HarnessReporter::new(&report_dir);
            reporter.record(TestRecord::skipped("stale"));
            reporter
                .suite_start(&HarnessConfig::default().with_report_dir(&report_dir))
                .unwrap();

            assert!(!report_dir.exists());
            assert!(reporter.records().is_empty());
        }
    }
}
