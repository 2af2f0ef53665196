//! Scraper abstraction and dispatch engine: one uniform contract over two
//! acquisition strategies (static fetch, dynamic render), with bounded
//! pooling of expensive instances, a cancellable result pipeline, and a
//! phase-tagged error taxonomy.

pub mod document;
pub mod error;
pub mod pool;
pub mod promise;
pub mod request;
pub mod router;
pub mod scraper;
pub mod testutil;

pub use document::{Document, ExtractError};
pub use error::{Phase, ScraperError};
pub use pool::{Lease, Pool, PoolConfig};
pub use promise::{ScraperPromise, Settlement};
pub use request::{ExtractFn, ScrapeOptions, ScrapeRequest, Strategy, WaitCondition};
pub use router::Router;
pub use scraper::{InstanceState, Scraper, ScraperFactory};
