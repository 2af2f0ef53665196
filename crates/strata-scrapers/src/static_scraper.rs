use async_trait::async_trait;
use reqwest::Client;

use strata_core::document::Document;
use strata_core::error::{Phase, ScraperError};
use strata_core::request::{ExtractFn, ScrapeOptions, Strategy};
use strata_core::scraper::{InstanceState, Scraper, ScraperFactory};

const USER_AGENT: &str = concat!("strata/", env!("CARGO_PKG_VERSION"));

/// Static acquisition: one HTTP GET, no script execution.
///
/// `load` and "page ready" are synonymous — there is no navigation concept.
/// Instances share the factory's connection pool through a cloned reqwest
/// client and are cheap enough that the pool never recycles them; the pool
/// only bounds outbound-request concurrency.
pub struct StaticScraper {
    client: Client,
    options: ScrapeOptions,
    state: InstanceState,
    url: Option<String>,
    body: Option<String>,
}

impl StaticScraper {
    fn new(client: Client) -> Self {
        Self {
            client,
            options: ScrapeOptions::default(),
            state: InstanceState::Idle,
            url: None,
            body: None,
        }
    }
}

#[async_trait]
impl Scraper for StaticScraper {
    fn strategy(&self) -> Strategy {
        Strategy::Static
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

        let mut request = self
            .client
            .get(url)
            .timeout(self.options.timeout);
        for (name, value) in &self.options.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            self.state = InstanceState::Idle;
            if e.is_timeout() {
                ScraperError::timeout(url, Phase::Load, self.options.timeout)
            } else if e.is_connect() {
                ScraperError::network(url, format!("connection failed: {e}"))
            } else {
                ScraperError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            self.state = InstanceState::Idle;
            return Err(ScraperError::navigation(
                url,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = response.text().await.map_err(|e| {
            self.state = InstanceState::Idle;
            ScraperError::network(url, format!("failed to read response body: {e}"))
        })?;

        tracing::debug!(%url, bytes = body.len(), "fetched page");
        self.url = Some(url.to_string());
        self.body = Some(body);
        self.state = InstanceState::Loaded;
        Ok(())
    }

    fn extract(&mut self, extractor: &ExtractFn) -> Result<serde_json::Value, ScraperError> {
        let url = self.url.clone().unwrap_or_default();
        let Some(body) = self.body.take() else {
            return Err(ScraperError::configuration(
                "extract called before a successful load",
            ));
        };
        self.state = InstanceState::Extracting;
        let document = Document::parse(&body);
        let result = extractor(&document)
            .map_err(|e| ScraperError::parse(&url, e.selector(), e));
        self.state = InstanceState::Idle;
        result
    }

    async fn dispose(&mut self) {
        // The client handle is shared with the factory; dropping request
        // state is all there is to release.
        self.state = InstanceState::Disposed;
        self.body = None;
        self.url = None;
    }
}

/// Factory for [`StaticScraper`] instances over one shared HTTP client.
pub struct StaticScraperFactory {
    client: Client,
}

impl StaticScraperFactory {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScraperError::configuration(format!("http client build failed: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ScraperFactory for StaticScraperFactory {
    fn strategy(&self) -> Strategy {
        Strategy::Static
    }

    async fn create(&self) -> Result<Box<dyn Scraper>, ScraperError> {
        Ok(Box::new(StaticScraper::new(self.client.clone())))
    }
}
