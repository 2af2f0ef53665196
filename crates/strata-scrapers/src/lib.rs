//! Concrete acquisition strategies for the strata dispatch engine.

pub mod static_scraper;

#[cfg(feature = "browser")]
pub mod dynamic_scraper;

use std::sync::Arc;

use strata_core::error::ScraperError;
use strata_core::pool::{Pool, PoolConfig};
use strata_core::router::Router;

pub use static_scraper::{StaticScraper, StaticScraperFactory};

#[cfg(feature = "browser")]
pub use dynamic_scraper::{DynamicScraper, DynamicScraperFactory};

/// A router serving the static strategy only, with a pool that acts purely
/// as an outbound-concurrency limiter (static instances are not recycled).
pub fn default_router() -> Result<Router, ScraperError> {
    Ok(Router::new([static_pool()?]))
}

/// A router serving both strategies: bounded browser sessions for dynamic
/// requests, rate-limited one-shot fetches for static ones.
#[cfg(feature = "browser")]
pub fn browser_router(max_browser_sessions: usize) -> Result<Router, ScraperError> {
    let dynamic_pool = Pool::new(
        Arc::new(DynamicScraperFactory::new()),
        PoolConfig {
            max_live: max_browser_sessions,
            ..PoolConfig::default()
        },
    );
    Ok(Router::new([static_pool()?, dynamic_pool]))
}

fn static_pool() -> Result<Pool, ScraperError> {
    Ok(Pool::new(
        Arc::new(StaticScraperFactory::new()?),
        PoolConfig {
            max_live: 16,
            max_waiting: 256,
            reuse_instances: false,
        },
    ))
}
