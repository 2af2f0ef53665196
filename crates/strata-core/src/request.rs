use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::document::{Document, ExtractError};
use crate::error::ScraperError;

/// Acquisition strategy for a scrape request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Raw HTML fetch, no script execution.
    Static,
    /// Full render via the headless-browser backend.
    Dynamic,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Static => write!(f, "static"),
            Strategy::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Strategy::Static),
            "dynamic" => Ok(Strategy::Dynamic),
            other => Err(ScraperError::configuration(format!(
                "unknown strategy '{other}' (expected 'static' or 'dynamic')"
            ))),
        }
    }
}

/// Criterion the dynamic strategy waits on before the page counts as loaded.
///
/// The static strategy ignores this: a completed fetch *is* page-ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WaitCondition {
    /// DOM-ready equivalent (the document body is present).
    #[default]
    DomReady,
    /// An element matching this CSS selector has appeared.
    Selector(String),
    /// A fixed delay after navigation.
    Delay(Duration),
}

/// Request-scoped options, validated before any resource is touched.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Effective deadline for the whole dispatch, queue wait included.
    pub timeout: Duration,
    /// Extra request headers (static strategy only).
    pub headers: Vec<(String, String)>,
    /// Readiness condition (dynamic strategy only).
    pub wait: WaitCondition,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            headers: Vec::new(),
            wait: WaitCondition::DomReady,
        }
    }
}

impl ScrapeOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_wait(mut self, wait: WaitCondition) -> Self {
        self.wait = wait;
        self
    }

    /// Reject structurally invalid options with a `Configuration` error.
    pub fn validate(&self) -> Result<(), ScraperError> {
        if self.timeout.is_zero() {
            return Err(ScraperError::configuration(
                "timeout must be a positive duration",
            ));
        }
        for (name, _) in &self.headers {
            if name.trim().is_empty() {
                return Err(ScraperError::configuration("header name must not be empty"));
            }
        }
        if let WaitCondition::Selector(sel) = &self.wait {
            if sel.trim().is_empty() {
                return Err(ScraperError::configuration(
                    "wait selector must not be empty",
                ));
            }
        }
        Ok(())
    }
}

/// Caller-supplied extraction function, run against the loaded document.
pub type ExtractFn =
    Arc<dyn Fn(&Document) -> Result<serde_json::Value, ExtractError> + Send + Sync>;

/// One scrape request. Immutable once submitted; exists only for the
/// duration of a single dispatch and is never persisted.
#[derive(Clone)]
pub struct ScrapeRequest {
    pub url: String,
    pub strategy: Strategy,
    pub extractor: ExtractFn,
    pub options: ScrapeOptions,
}

impl ScrapeRequest {
    pub fn new<F>(url: impl Into<String>, strategy: Strategy, extractor: F) -> Self
    where
        F: Fn(&Document) -> Result<serde_json::Value, ExtractError> + Send + Sync + 'static,
    {
        Self {
            url: url.into(),
            strategy,
            extractor: Arc::new(extractor),
            options: ScrapeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScrapeOptions) -> Self {
        self.options = options;
        self
    }

    /// Pre-flight validation: options plus URL scheme/shape.
    pub fn validate(&self) -> Result<(), ScraperError> {
        self.options.validate()?;

        let parsed = Url::parse(&self.url)
            .map_err(|e| ScraperError::configuration(format!("invalid url '{}': {e}", self.url)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ScraperError::configuration(format!(
                "url scheme '{scheme}' is not allowed (only http/https)"
            ))),
        }
    }
}

impl std::fmt::Debug for ScrapeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeRequest")
            .field("url", &self.url)
            .field("strategy", &self.strategy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
