use async_trait::async_trait;

use crate::error::ScraperError;
use crate::request::{ExtractFn, ScrapeOptions, Strategy};

/// Internal state of a scraper instance across its lifecycle.
///
/// `Idle → Loading → Loaded → Extracting → Idle` on the happy path;
/// `Disposed` is terminal and reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Created or recycled, ready for a new request.
    Idle,
    /// `load` is in flight.
    Loading,
    /// A page has been loaded and can be extracted from.
    Loaded,
    /// The extractor is running.
    Extracting,
    /// All resources released; the instance must not be reused.
    Disposed,
}

/// Lifecycle contract every acquisition strategy implements.
///
/// The router drives instances through `configure → load → extract` under a
/// single deadline and releases or discards them afterwards; it only ever
/// operates on this trait, never on concrete strategy types.
///
/// Invariants:
/// - `extract` must not be called before a successful `load`; implementations
///   fail the call with a `Configuration` error if it is.
/// - `dispose` may be called from any state, is idempotent, and never fails:
///   underlying teardown errors are logged and swallowed, since the instance
///   is being discarded either way.
#[async_trait]
pub trait Scraper: Send {
    /// The strategy this instance implements.
    fn strategy(&self) -> Strategy;

    /// Current lifecycle state.
    fn state(&self) -> InstanceState;

    /// Store request-scoped options. Options are validated by the router
    /// pre-flight; implementations may reject what they cannot honor.
    fn configure(&mut self, options: &ScrapeOptions) -> Result<(), ScraperError>;

    /// Acquire the page content for `url`. For the static strategy this is a
    /// single fetch; for the dynamic strategy, navigation plus the configured
    /// readiness condition.
    async fn load(&mut self, url: &str) -> Result<(), ScraperError>;

    /// Run the caller-supplied extractor against the loaded document.
    /// Synchronous: both strategies hold the markup in memory after `load`.
    fn extract(&mut self, extractor: &ExtractFn) -> Result<serde_json::Value, ScraperError>;

    /// Whether this instance hit an unrecoverable state (e.g. the browser
    /// session died) and must not return to the pool.
    fn is_fatal(&self) -> bool {
        false
    }

    /// Release all resources held by this instance. Idempotent.
    async fn dispose(&mut self);
}

/// Creates scraper instances for one strategy; each pool owns one factory.
#[async_trait]
pub trait ScraperFactory: Send + Sync {
    /// The strategy of the instances this factory creates.
    fn strategy(&self) -> Strategy;

    /// Create a fresh instance. For the dynamic strategy this launches a
    /// browser session and is the expensive path the pool exists to bound.
    async fn create(&self) -> Result<Box<dyn Scraper>, ScraperError>;
}
