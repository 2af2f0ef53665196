use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;

use strata_core::document::Document;
use strata_core::error::ScraperError;
use strata_core::request::{ExtractFn, ScrapeOptions, Strategy, WaitCondition};
use strata_core::scraper::{InstanceState, Scraper, ScraperFactory};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Dynamic acquisition: full rendering in a headless Chromium session via
/// the Chrome DevTools Protocol.
///
/// Each instance owns one browser process, which is why instances of this
/// strategy are pooled under a strict bound. A page (tab) lives entirely
/// inside `load`: navigate, await the readiness condition, capture the
/// rendered DOM, close the tab. The rendered markup then goes through the
/// same queryable-document extraction as the static strategy, so
/// script-produced content is visible to extractors.
pub struct DynamicScraper {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
    options: ScrapeOptions,
    state: InstanceState,
    fatal: bool,
    url: Option<String>,
    content: Option<String>,
}

#[async_trait]
impl Scraper for DynamicScraper {
    fn strategy(&self) -> Strategy {
        Strategy::Dynamic
    }

    fn state(&self) -> InstanceState {
        self.state
    }

    fn configure(&mut self, options: &ScrapeOptions) -> Result<(), ScraperError> {
        options.validate()?;
        self.options = options.clone();
        Ok(())
    }

    async fn load(&mut self, url: &str) -> Result<(), ScraperError> {
        self.state = InstanceState::Loading;

        let Some(browser) = self.browser.as_ref() else {
            self.state = InstanceState::Idle;
            self.fatal = true;
            return Err(ScraperError::navigation(url, "browser session is disposed"));
        };

        // Session-level failures mark the instance fatal so the pool
        // discards it instead of recycling a dead browser.
        let page = match browser.new_page(url).await {
            Ok(page) => page,
            Err(e) => {
                self.state = InstanceState::Idle;
                self.fatal = true;
                return Err(ScraperError::navigation(
                    url,
                    format!("failed to open page: {e}"),
                ));
            }
        };

        // The readiness wait runs unbounded here; the pipeline's deadline
        // cancels it from the outside and tags the timeout with the
        // navigation phase.
        match &self.options.wait {
            WaitCondition::DomReady => {
                if let Err(e) = page.find_element("body").await {
                    self.state = InstanceState::Idle;
                    let _ = page.close().await;
                    return Err(ScraperError::navigation(
                        url,
                        format!("page did not render a body: {e}"),
                    ));
                }
            }
            WaitCondition::Selector(selector) => {
                while page.find_element(selector.as_str()).await.is_err() {
                    tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
                }
            }
            WaitCondition::Delay(delay) => {
                tokio::time::sleep(*delay).await;
            }
        }

        let content = match page.content().await {
            Ok(content) => content,
            Err(e) => {
                self.state = InstanceState::Idle;
                self.fatal = true;
                let _ = page.close().await;
                return Err(ScraperError::navigation(
                    url,
                    format!("failed to read rendered content: {e}"),
                ));
            }
        };
        let _ = page.close().await;

        tracing::debug!(%url, bytes = content.len(), "captured rendered page");
        self.url = Some(url.to_string());
        self.content = Some(content);
        self.state = InstanceState::Loaded;
        Ok(())
    }

    fn extract(&mut self, extractor: &ExtractFn) -> Result<serde_json::Value, ScraperError> {
        let url = self.url.clone().unwrap_or_default();
        let Some(content) = self.content.take() else {
            return Err(ScraperError::configuration(
                "extract called before a successful load",
            ));
        };
        self.state = InstanceState::Extracting;
        let document = Document::parse(&content);
        let result = extractor(&document)
            .map_err(|e| ScraperError::parse(&url, e.selector(), e));
        self.state = InstanceState::Idle;
        result
    }

    fn is_fatal(&self) -> bool {
        self.fatal
    }

    async fn dispose(&mut self) {
        if self.state == InstanceState::Disposed {
            return;
        }
        self.state = InstanceState::Disposed;
        self.content = None;
        self.url = None;
        if let Some(mut browser) = self.browser.take() {
            // Best-effort teardown; the instance is discarded either way.
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "browser close failed during dispose");
            }
        }
        self.handler_task.abort();
    }
}

impl Drop for DynamicScraper {
    fn drop(&mut self) {
        // Dispose normally runs first; this only reaps the CDP handler if
        // the instance is dropped on an unexpected path.
        self.handler_task.abort();
    }
}

/// Launches one headless Chromium session per created instance.
pub struct DynamicScraperFactory {
    _private: (),
}

impl DynamicScraperFactory {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Locate a usable Chrome/Chromium binary, honouring `CHROME_BIN` first
    /// and falling back to well-known install paths. Returning `None` lets
    /// chromiumoxide do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        const CANDIDATES: &[&str] = &[
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];
        CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
    }
}

impl Default for DynamicScraperFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScraperFactory for DynamicScraperFactory {
    fn strategy(&self) -> Strategy {
        Strategy::Dynamic
    }

    async fn create(&self) -> Result<Box<dyn Scraper>, ScraperError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("using chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }
        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| ScraperError::configuration(format!("browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            ScraperError::configuration(format!("failed to launch browser: {e}"))
        })?;

        // The CDP handler must be polled continuously for the connection
        // to stay alive.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Box::new(DynamicScraper {
            browser: Some(browser),
            handler_task,
            options: ScrapeOptions::default(),
            state: InstanceState::Idle,
            fatal: false,
            url: None,
            content: None,
        }))
    }
}
