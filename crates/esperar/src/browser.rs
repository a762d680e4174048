//! Real browser control over the Chrome DevTools Protocol.
//!
//! With the `browser` feature enabled, [`Browser`] launches a Chromium
//! instance via chromiumoxide and [`CdpClient`] implements
//! [`DomClient`](crate::client::DomClient) on top of it. Elements are
//! addressed by re-evaluated JavaScript queries compiled from
//! [`Locator`](crate::locator::Locator), so a handle whose node was swapped
//! out surfaces as a stale reference on the next interaction, matching the
//! contract the wait layer retries on.
//!
//! Without the feature only [`BrowserConfig`] is available; tests run
//! against the scriptable mock client instead.

use serde::{Deserialize, Serialize};

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to the chromium binary (`None` = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set the chromium binary path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable the sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::client::{ClientError, DomClient, ElementHandle, LogEntry};
    use crate::locator::Locator;
    use crate::result::{EsperaError, EsperaResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Console hook installed once per page; entries drain through
    /// `window.__espera_logs`.
    const CONSOLE_HOOK: &str = r"(function() {
        if (window.__espera_logs) { return true; }
        window.__espera_logs = [];
        const levels = { debug: 'DEBUG', log: 'INFO', info: 'INFO', warn: 'WARNING', error: 'SEVERE' };
        for (const name of Object.keys(levels)) {
            const original = console[name].bind(console);
            console[name] = (...args) => {
                window.__espera_logs.push({
                    level: levels[name],
                    kind: 'console-api',
                    message: args.map(String).join(' '),
                });
                original(...args);
            };
        }
        return true;
    })()";

    fn map_cdp_err(error: &chromiumoxide::error::CdpError) -> ClientError {
        let message = error.to_string();
        if message.contains("closed") || message.contains("Connection") {
            ClientError::SessionLost { message }
        } else {
            ClientError::Protocol { message }
        }
    }

    /// A launched Chromium instance
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        #[allow(dead_code)]
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch a browser.
        ///
        /// # Errors
        ///
        /// [`EsperaError::BrowserLaunch`] when Chromium cannot be started.
        pub async fn launch(config: BrowserConfig) -> EsperaResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(|e| EsperaError::BrowserLaunch {
                message: e.to_string(),
            })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| EsperaError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// The launch configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Open a fresh page and wrap it as a [`CdpClient`].
        ///
        /// # Errors
        ///
        /// CDP failures opening the page or installing the console hook.
        pub async fn new_client(&self) -> EsperaResult<CdpClient> {
            let browser = self.inner.lock().await;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| EsperaError::Client(map_cdp_err(&e)))?;
            let client = CdpClient::new(page);
            client.install_console_hook().await?;
            Ok(client)
        }

        /// Close the browser.
        ///
        /// # Errors
        ///
        /// CDP failures during shutdown.
        pub async fn close(self) -> EsperaResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| EsperaError::Client(map_cdp_err(&e)))?;
            Ok(())
        }
    }

    /// [`DomClient`] over one CDP page
    #[derive(Debug)]
    pub struct CdpClient {
        page: Arc<Mutex<CdpPage>>,
        queries: Mutex<HashMap<u64, String>>,
        next_id: AtomicU64,
    }

    impl CdpClient {
        /// Wrap an existing page
        #[must_use]
        pub fn new(page: CdpPage) -> Self {
            Self {
                page: Arc::new(Mutex::new(page)),
                queries: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }
        }

        async fn install_console_hook(&self) -> EsperaResult<()> {
            let page = self.page.lock().await;
            page.evaluate(CONSOLE_HOOK)
                .await
                .map_err(|e| EsperaError::Client(map_cdp_err(&e)))?;
            Ok(())
        }

        async fn eval<T: serde::de::DeserializeOwned>(&self, expr: &str) -> Result<T, ClientError> {
            let page = self.page.lock().await;
            let result = page.evaluate(expr).await.map_err(|e| map_cdp_err(&e))?;
            result.into_value().map_err(|e| ClientError::Protocol {
                message: e.to_string(),
            })
        }

        async fn register_handle(&self, query: String, selector: String) -> ElementHandle {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.queries.lock().await.insert(id, query);
            ElementHandle::new(id, selector)
        }

        async fn query_for(&self, handle: &ElementHandle) -> Result<String, ClientError> {
            self.queries
                .lock()
                .await
                .get(&handle.raw_id)
                .cloned()
                .ok_or_else(|| ClientError::StaleElement {
                    selector: handle.selector.clone(),
                })
        }
    }

    #[async_trait]
    impl DomClient for CdpClient {
        async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, ClientError> {
            let query = locator.to_query();
            let exists: bool = self.eval(&format!("!!({query})")).await?;
            if !exists {
                return Err(ClientError::NoSuchElement {
                    selector: locator.to_string(),
                });
            }
            Ok(self.register_handle(query, locator.to_string()).await)
        }

        async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, ClientError> {
            let count: u64 = self.eval(&locator.to_count_query()).await?;
            let mut handles = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
            for index in 0..usize::try_from(count).unwrap_or(0) {
                let query = locator.to_query_indexed(index);
                handles.push(self.register_handle(query, locator.to_string()).await);
            }
            Ok(handles)
        }

        async fn click(&self, element: &ElementHandle) -> Result<(), ClientError> {
            let query = self.query_for(element).await?;
            let clicked: bool = self
                .eval(&format!(
                    "(function() {{ const el = {query}; if (!el) {{ return false; }} el.click(); return true; }})()"
                ))
                .await?;
            if clicked {
                Ok(())
            } else {
                Err(ClientError::StaleElement {
                    selector: element.selector.clone(),
                })
            }
        }

        async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), ClientError> {
            let query = self.query_for(element).await?;
            let focused: bool = self
                .eval(&format!(
                    "(function() {{ const el = {query}; if (!el) {{ return false; }} el.focus(); return true; }})()"
                ))
                .await?;
            if !focused {
                return Err(ClientError::StaleElement {
                    selector: element.selector.clone(),
                });
            }
            let page = self.page.lock().await;
            for ch in text.chars() {
                let params = DispatchKeyEventParams::builder()
                    .r#type(DispatchKeyEventType::Char)
                    .text(ch.to_string())
                    .build()
                    .map_err(|e| ClientError::Protocol {
                        message: e.to_string(),
                    })?;
                page.execute(params).await.map_err(|e| map_cdp_err(&e))?;
            }
            Ok(())
        }

        async fn get_text(&self, element: &ElementHandle) -> Result<String, ClientError> {
            let query = self.query_for(element).await?;
            let text: Option<String> = self
                .eval(&format!(
                    "(function() {{ const el = {query}; return el ? el.textContent : null; }})()"
                ))
                .await?;
            text.ok_or_else(|| ClientError::StaleElement {
                selector: element.selector.clone(),
            })
        }

        async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, ClientError> {
            let query = self.query_for(element).await?;
            let displayed: Option<bool> = self
                .eval(&format!(
                    "(function() {{ const el = {query}; if (!el) {{ return null; }} \
                     const rect = el.getBoundingClientRect(); \
                     const style = window.getComputedStyle(el); \
                     return rect.width > 0 && rect.height > 0 \
                         && style.visibility !== 'hidden' && style.display !== 'none'; }})()"
                ))
                .await?;
            displayed.ok_or_else(|| ClientError::StaleElement {
                selector: element.selector.clone(),
            })
        }

        async fn navigate_to(&self, url: &str) -> Result<(), ClientError> {
            {
                let page = self.page.lock().await;
                page.goto(url).await.map_err(|e| map_cdp_err(&e))?;
            }
            // a fresh document needs the hook again
            self.install_console_hook()
                .await
                .map_err(|e| ClientError::Protocol {
                    message: e.to_string(),
                })
        }

        async fn take_screenshot(&self) -> Result<String, ClientError> {
            let page = self.page.lock().await;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let screenshot = page.execute(params).await.map_err(|e| map_cdp_err(&e))?;
            Ok(screenshot.data.clone())
        }

        async fn get_page_source(&self) -> Result<String, ClientError> {
            self.eval("document.documentElement.outerHTML").await
        }

        async fn get_browser_logs(&self) -> Result<Vec<LogEntry>, ClientError> {
            let drained: String = self
                .eval("JSON.stringify(window.__espera_logs ? window.__espera_logs.splice(0) : [])")
                .await?;
            serde_json::from_str(&drained).map_err(|e| ClientError::Protocol {
                message: format!("console log payload: {e}"),
            })
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, CdpClient};
