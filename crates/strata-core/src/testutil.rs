//! Test utilities: an instrumented mock scraper and factory.
//!
//! Handwritten mocks for dependency injection in unit tests. Shared state
//! lives behind `Arc<Mutex<_>>` so tests can assert on recorded lifecycle
//! calls after instances have been moved into pools and pipelines.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::ScraperError;
use crate::request::{ExtractFn, ScrapeOptions, Strategy};
use crate::scraper::{InstanceState, Scraper, ScraperFactory};

const DEFAULT_HTML: &str = "<html><body><h1>mock</h1></body></html>";

/// Per-instance lifecycle counters, shared with the factory that created it.
#[derive(Debug, Default)]
pub struct MockCalls {
    pub configure: usize,
    pub load: usize,
    pub extract: usize,
    pub dispose: usize,
}

#[derive(Clone)]
struct MockBehavior {
    html: String,
    load_delay: Duration,
    /// When set, `load` fails with a network error carrying this cause.
    load_error: Option<String>,
    /// When set, the instance reports fatal after a completed load.
    fatal_after_load: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            html: DEFAULT_HTML.to_string(),
            load_delay: Duration::ZERO,
            load_error: None,
            fatal_after_load: false,
        }
    }
}

/// Instrumented [`Scraper`] driven entirely by configured behavior.
pub struct MockScraper {
    behavior: MockBehavior,
    strategy: Strategy,
    state: InstanceState,
    fatal: bool,
    content: Option<String>,
    url: Option<String>,
    calls: Arc<Mutex<MockCalls>>,
}

#[async_trait]
impl Scraper for MockScraper {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn state(&self) -> InstanceState {
        self.state
    }

    fn configure(&mut self, _options: &ScrapeOptions) -> Result<(), ScraperError> {
        self.calls.lock().unwrap().configure += 1;
        Ok(())
    }

    async fn load(&mut self, url: &str) -> Result<(), ScraperError> {
        self.calls.lock().unwrap().load += 1;
        self.state = InstanceState::Loading;
        if !self.behavior.load_delay.is_zero() {
            tokio::time::sleep(self.behavior.load_delay).await;
        }
        if let Some(cause) = &self.behavior.load_error {
            self.state = InstanceState::Idle;
            return Err(ScraperError::network(url, cause));
        }
        self.content = Some(self.behavior.html.clone());
        self.url = Some(url.to_string());
        self.fatal = self.behavior.fatal_after_load;
        self.state = InstanceState::Loaded;
        Ok(())
    }

    fn extract(&mut self, extractor: &ExtractFn) -> Result<serde_json::Value, ScraperError> {
        self.calls.lock().unwrap().extract += 1;
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
        self.calls.lock().unwrap().dispose += 1;
    }
}

/// Factory producing [`MockScraper`]s and retaining a handle to every
/// instance it creates, for post-hoc assertions.
#[derive(Clone)]
pub struct MockFactory {
    strategy: Strategy,
    behavior: MockBehavior,
    fail_create: bool,
    instances: Arc<Mutex<Vec<Arc<Mutex<MockCalls>>>>>,
}

impl MockFactory {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            behavior: MockBehavior::default(),
            fail_create: false,
            instances: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve this markup from every created instance.
    pub fn with_html(mut self, html: &str) -> Self {
        self.behavior.html = html.to_string();
        self
    }

    /// Make every `load` take at least this long.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.behavior.load_delay = delay;
        self
    }

    /// Make every `load` fail with a network error.
    pub fn with_load_error(mut self, cause: &str) -> Self {
        self.behavior.load_error = Some(cause.to_string());
        self
    }

    /// Mark instances fatal once they have loaded (a crashed-session stand-in).
    pub fn with_fatal_after_load(mut self) -> Self {
        self.behavior.fatal_after_load = true;
        self
    }

    /// Make `create` itself fail.
    pub fn fail_creation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Number of instances created so far.
    pub fn created(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    /// Dispose count recorded on the `index`-th created instance.
    pub fn dispose_count(&self, index: usize) -> usize {
        self.instances.lock().unwrap()[index].lock().unwrap().dispose
    }

    /// Dispose calls summed over every created instance.
    pub fn total_dispose_count(&self) -> usize {
        self.instances
            .lock()
            .unwrap()
            .iter()
            .map(|calls| calls.lock().unwrap().dispose)
            .sum()
    }

    /// Load count recorded on the `index`-th created instance.
    pub fn load_count(&self, index: usize) -> usize {
        self.instances.lock().unwrap()[index].lock().unwrap().load
    }
}

#[async_trait]
impl ScraperFactory for MockFactory {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    async fn create(&self) -> Result<Box<dyn Scraper>, ScraperError> {
        if self.fail_create {
            return Err(ScraperError::configuration("mock creation failure"));
        }
        let calls = Arc::new(Mutex::new(MockCalls::default()));
        self.instances.lock().unwrap().push(Arc::clone(&calls));
        Ok(Box::new(MockScraper {
            behavior: self.behavior.clone(),
            strategy: self.strategy,
            state: InstanceState::Idle,
            fatal: false,
            content: None,
            url: None,
            calls,
        }))
    }
}
