//! Bounded pooling of scraper instances.
//!
//! Each pool owns one [`ScraperFactory`] and hands out exclusively-owned
//! instances behind a [`Lease`]. Live instances (leased + idle) never exceed
//! `max_live`; excess demand queues FIFO on a fair semaphore up to
//! `max_waiting`, beyond which acquisition fails fast. The dynamic pool's
//! bound is the system's main backpressure control — it is what prevents
//! unbounded browser-process growth under load.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::error::ScraperError;
use crate::request::Strategy;
use crate::scraper::{InstanceState, Scraper, ScraperFactory};

/// Configuration for one strategy's pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum concurrently live instances (leased plus idle).
    pub max_live: usize,

    /// Maximum queued acquisitions before new ones fail fast.
    pub max_waiting: usize,

    /// Whether healthy instances return to the idle set for reuse.
    /// Static instances are cheap and stateless, so their pool sets this
    /// to `false` and acts purely as a concurrency limiter.
    pub reuse_instances: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_live: 4,
            max_waiting: 64,
            reuse_instances: true,
        }
    }
}

/// Bounded set of reusable instances plus a fairness queue for excess demand.
#[derive(Clone)]
pub struct Pool {
    factory: Arc<dyn ScraperFactory>,
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<Box<dyn Scraper>>>>,
    waiting: Arc<AtomicUsize>,
}

impl Pool {
    pub fn new(factory: Arc<dyn ScraperFactory>, config: PoolConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_live));
        Self {
            factory,
            config,
            semaphore,
            idle: Arc::new(Mutex::new(Vec::new())),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The strategy this pool serves.
    pub fn strategy(&self) -> Strategy {
        self.factory.strategy()
    }

    pub fn reuses_instances(&self) -> bool {
        self.config.reuse_instances
    }

    /// Acquire an exclusively-owned instance: reuse an idle one, create one
    /// lazily while under the bound, or queue FIFO until a slot frees up.
    pub async fn acquire(&self) -> Result<Lease, ScraperError> {
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => {
                return Err(ScraperError::configuration("pool is shut down"));
            }
            Err(TryAcquireError::NoPermits) => {
                if self.waiting.load(Ordering::SeqCst) >= self.config.max_waiting {
                    return Err(ScraperError::configuration("queue saturated"));
                }
                let _guard = WaitGuard::enter(&self.waiting);
                // Tokio semaphores are fair, so waiters are served strictly
                // in arrival order.
                self.semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| ScraperError::configuration("pool is shut down"))?
            }
        };

        let reused = self.idle.lock().unwrap().pop();
        let instance = match reused {
            Some(instance) => {
                tracing::debug!(strategy = %self.strategy(), "reusing idle scraper instance");
                instance
            }
            // Creation failure drops the permit, so the slot is not leaked.
            None => {
                tracing::debug!(strategy = %self.strategy(), "creating scraper instance");
                self.factory.create().await?
            }
        };

        Ok(Lease {
            instance: Some(instance),
            pool: self.clone(),
            _permit: permit,
        })
    }

    /// Number of idle instances currently available for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    /// Number of acquisitions currently queued.
    pub fn waiting_count(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Reject further acquisitions and dispose every idle instance.
    pub async fn shutdown(&self) {
        self.semaphore.close();
        let drained: Vec<_> = std::mem::take(&mut *self.idle.lock().unwrap());
        for mut instance in drained {
            instance.dispose().await;
        }
    }

    fn release_idle(&self, instance: Box<dyn Scraper>) {
        if self.semaphore.is_closed() {
            dispose_in_background(instance);
        } else {
            self.idle.lock().unwrap().push(instance);
        }
    }
}

/// Exclusive hold on a pooled instance for the duration of one request.
///
/// Exactly one of three things happens to the instance: [`Lease::release`]
/// returns it to the idle set, [`Lease::discard`] disposes it and frees the
/// slot, or — if the lease is dropped without either — it is disposed on a
/// background task so no exit path can leak a live browser session.
pub struct Lease {
    instance: Option<Box<dyn Scraper>>,
    pool: Pool,
    _permit: OwnedSemaphorePermit,
}

impl Lease {
    /// Return the instance to the pool for reuse. Fatal or disposed
    /// instances, and instances of non-reusing pools, are disposed instead.
    pub fn release(mut self) {
        if let Some(instance) = self.instance.take() {
            let healthy = !instance.is_fatal() && instance.state() != InstanceState::Disposed;
            if healthy && self.pool.reuses_instances() {
                self.pool.release_idle(instance);
            } else {
                dispose_in_background(instance);
            }
        }
    }

    /// Dispose the instance now and free its slot. Used on every failure
    /// path, where disposal must complete before the pipeline settles.
    pub async fn discard(mut self) {
        if let Some(mut instance) = self.instance.take() {
            instance.dispose().await;
        }
    }
}

impl Deref for Lease {
    type Target = dyn Scraper;

    fn deref(&self) -> &Self::Target {
        self.instance
            .as_deref()
            .expect("lease accessed after release")
    }
}

impl DerefMut for Lease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.instance
            .as_deref_mut()
            .expect("lease accessed after release")
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("held", &self.instance.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            dispose_in_background(instance);
        }
    }
}

fn dispose_in_background(mut instance: Box<dyn Scraper>) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            instance.dispose().await;
        });
    }
}

/// Keeps the waiter count accurate even if the acquire future is dropped
/// mid-wait (e.g. by cancellation).
struct WaitGuard<'a> {
    waiting: &'a AtomicUsize,
}

impl<'a> WaitGuard<'a> {
    fn enter(waiting: &'a AtomicUsize) -> Self {
        waiting.fetch_add(1, Ordering::SeqCst);
        Self { waiting }
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockFactory;

    fn pool_with(max_live: usize, max_waiting: usize) -> (Pool, MockFactory) {
        let factory = MockFactory::new(Strategy::Dynamic);
        let pool = Pool::new(
            Arc::new(factory.clone()),
            PoolConfig {
                max_live,
                max_waiting,
                reuse_instances: true,
            },
        );
        (pool, factory)
    }

    #[tokio::test]
    async fn creates_lazily_and_reuses_idle() {
        let (pool, factory) = pool_with(2, 8);

        let lease = pool.acquire().await.unwrap();
        assert_eq!(factory.created(), 1);
        lease.release();
        assert_eq!(pool.idle_count(), 1);

        let _lease = pool.acquire().await.unwrap();
        assert_eq!(factory.created(), 1, "idle instance should be reused");
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn never_exceeds_the_live_bound() {
        let (pool, factory) = pool_with(2, 8);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_eq!(factory.created(), 2);

        let waiter = tokio::spawn({
            let pool = pool.clone();
            async move { pool.acquire().await.unwrap() }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "third acquire should queue");
        assert_eq!(pool.waiting_count(), 1);

        a.release();
        let c = waiter.await.unwrap();
        assert_eq!(factory.created(), 2, "waiter should get the recycled slot");

        b.release();
        c.release();
    }

    #[tokio::test]
    async fn saturated_queue_fails_fast() {
        let (pool, _factory) = pool_with(1, 1);

        let held = pool.acquire().await.unwrap();
        let queued = tokio::spawn({
            let pool = pool.clone();
            async move { pool.acquire().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let err = pool.acquire().await.unwrap_err();
        assert!(err.to_string().contains("queue saturated"));

        held.release();
        assert!(queued.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn waiters_are_served_fifo() {
        let (pool, _factory) = pool_with(1, 8);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = pool.acquire().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..3 {
            let pool = pool.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let lease = pool.acquire().await.unwrap();
                order.lock().unwrap().push(i);
                lease.release();
            }));
            // Give each waiter time to enter the queue in submission order.
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        first.release();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn dropped_lease_still_disposes() {
        let (pool, factory) = pool_with(1, 8);

        let lease = pool.acquire().await.unwrap();
        drop(lease);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(factory.dispose_count(0), 1);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_disposes_idle_and_rejects_acquires() {
        let (pool, factory) = pool_with(2, 8);

        let lease = pool.acquire().await.unwrap();
        lease.release();
        assert_eq!(pool.idle_count(), 1);

        pool.shutdown().await;
        assert_eq!(factory.dispose_count(0), 1);

        let err = pool.acquire().await.unwrap_err();
        assert!(err.to_string().contains("shut down"));
    }

    #[tokio::test]
    async fn factory_failure_does_not_leak_a_slot() {
        let factory = MockFactory::new(Strategy::Dynamic).fail_creation();
        let pool = Pool::new(
            Arc::new(factory),
            PoolConfig {
                max_live: 1,
                max_waiting: 8,
                reuse_instances: true,
            },
        );

        assert!(pool.acquire().await.is_err());
        // The slot freed by the failed creation must be acquirable again.
        assert!(pool.acquire().await.is_err());
    }
}
