//! Request routing: strategy selection, instance acquisition, and the
//! lifecycle pipeline driving `configure → load → extract` under one
//! deadline and cancellation token.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{Phase, ScraperError};
use crate::pool::{Lease, Pool};
use crate::promise::{ScraperPromise, Settlement};
use crate::request::{ScrapeRequest, Strategy};

/// Selects a pool by strategy and wraps each scrape in a [`ScraperPromise`].
///
/// Routing is stateless beyond strategy selection: no caching, no
/// deduplication, no retries. A single request's failure is a single
/// terminal outcome; retry policy belongs to the caller, which the typed
/// taxonomy makes practical.
pub struct Router {
    pools: HashMap<Strategy, Pool>,
}

impl Router {
    /// Build a router over explicitly-passed pools, keyed by each pool's
    /// strategy. Passing the pools in (rather than constructing them
    /// internally) keeps the router testable against mock factories.
    pub fn new(pools: impl IntoIterator<Item = Pool>) -> Self {
        Self {
            pools: pools.into_iter().map(|p| (p.strategy(), p)).collect(),
        }
    }

    /// Dispatch one scrape request, returning its result pipeline
    /// immediately. Pre-flight failures (invalid options or URL, no pool
    /// for the strategy) reject without touching any instance or factory.
    pub fn dispatch(&self, request: ScrapeRequest) -> ScraperPromise {
        if let Err(err) = request.validate() {
            return ScraperPromise::rejected(&request.url, err);
        }
        let Some(pool) = self.pools.get(&request.strategy) else {
            return ScraperPromise::rejected(
                &request.url,
                ScraperError::configuration(format!(
                    "no scraper pool registered for strategy '{}'",
                    request.strategy
                )),
            );
        };

        tracing::info!(url = %request.url, strategy = %request.strategy, "dispatching scrape");

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let promise = ScraperPromise::new(&request.url, rx, cancel.clone());

        let pool = pool.clone();
        tokio::spawn(async move {
            let outcome = run_pipeline(pool, request, cancel).await;
            // The caller may have dropped the promise; the instance has
            // already been released either way.
            let _ = tx.send(outcome);
        });

        promise
    }

    /// Drain every pool: reject new acquisitions and dispose idle instances.
    pub async fn shutdown(&self) {
        for pool in self.pools.values() {
            pool.shutdown().await;
        }
    }
}

/// One request's control flow, start to settlement. Every exit path leaves
/// the instance either back in the idle set or disposed with its slot freed.
async fn run_pipeline(
    pool: Pool,
    request: ScrapeRequest,
    cancel: CancellationToken,
) -> Settlement {
    let started = Instant::now();
    let deadline = request.options.timeout;

    let mut lease = tokio::select! {
        biased;
        acquired = tokio::time::timeout(deadline, pool.acquire()) => match acquired {
            Ok(lease) => lease?,
            Err(_) => {
                return Err(ScraperError::timeout(
                    &request.url,
                    Phase::Queue,
                    started.elapsed(),
                ));
            }
        },
        () = cancel.cancelled() => {
            return Err(cancelled(&request.url, started));
        }
    };

    match run_lifecycle(&mut lease, &request, &cancel, started).await {
        Ok(value) => {
            if pool.reuses_instances() && !lease.is_fatal() {
                lease.release();
            } else {
                lease.discard().await;
            }
            Ok(value)
        }
        Err(err) => {
            // A failed or timed-out instance is in an unknown state and is
            // never returned to the pool.
            tracing::debug!(url = %request.url, error = %err, "scrape failed, discarding instance");
            lease.discard().await;
            Err(err)
        }
    }
}

async fn run_lifecycle(
    lease: &mut Lease,
    request: &ScrapeRequest,
    cancel: &CancellationToken,
    started: Instant,
) -> Settlement {
    lease.configure(&request.options)?;

    let load_phase = match lease.strategy() {
        Strategy::Static => Phase::Load,
        Strategy::Dynamic => Phase::Navigation,
    };
    let remaining = request.options.timeout.saturating_sub(started.elapsed());

    tokio::select! {
        biased;
        loaded = tokio::time::timeout(remaining, lease.load(&request.url)) => match loaded {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScraperError::timeout(
                    &request.url,
                    load_phase,
                    started.elapsed(),
                ));
            }
        },
        () = cancel.cancelled() => {
            return Err(cancelled(&request.url, started));
        }
    }

    if cancel.is_cancelled() {
        return Err(cancelled(&request.url, started));
    }

    lease.extract(&request.extractor)
}

fn cancelled(url: &str, started: Instant) -> ScraperError {
    ScraperError::timeout(url, Phase::Cancelled, started.elapsed())
}
