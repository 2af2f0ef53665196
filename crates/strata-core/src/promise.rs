//! The async result pipeline wrapping one scrape operation.
//!
//! A [`ScraperPromise`] settles exactly once — the driving task owns the
//! oneshot sender and the receiver is consumed on await — with either the
//! extracted data or a typed [`ScraperError`]. Cancellation is explicit: the
//! token handed out here is observed at every suspension point of the
//! pipeline, which then disposes any held instance before rejecting with a
//! `cancelled`-phase timeout.

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::document::ExtractError;
use crate::error::ScraperError;

/// Terminal outcome of a scrape pipeline.
pub type Settlement = Result<serde_json::Value, ScraperError>;

type Transform =
    Box<dyn FnOnce(serde_json::Value) -> Result<serde_json::Value, ExtractError> + Send>;

/// Cancellable, chainable handle to one in-flight scrape.
///
/// Dropping the promise does not abort the pipeline; the instance it holds
/// is still driven to release. Awaiting (via `.await` or [`wait`]) yields
/// the settlement with any attached transforms applied.
///
/// [`wait`]: ScraperPromise::wait
pub struct ScraperPromise {
    url: String,
    rx: oneshot::Receiver<Settlement>,
    cancel: CancellationToken,
    transforms: Vec<Transform>,
}

impl ScraperPromise {
    pub(crate) fn new(
        url: impl Into<String>,
        rx: oneshot::Receiver<Settlement>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            url: url.into(),
            rx,
            cancel,
            transforms: Vec::new(),
        }
    }

    /// A promise already settled with `err`; used for pre-flight failures
    /// where no instance was ever touched.
    pub(crate) fn rejected(url: impl Into<String>, err: ScraperError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self::new(url, rx, CancellationToken::new())
    }

    /// Request cancellation. The pipeline rejects with a timeout tagged
    /// phase `cancelled` and disposes any partially-initialized instance.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Attach a transform applied to the resolved data, without re-entering
    /// the scraper lifecycle. Transform failures surface as parse errors
    /// carrying the request URL.
    pub fn map<F>(mut self, f: F) -> Self
    where
        F: FnOnce(serde_json::Value) -> Result<serde_json::Value, ExtractError> + Send + 'static,
    {
        self.transforms.push(Box::new(f));
        self
    }

    /// Await settlement and run the transform chain.
    pub async fn wait(self) -> Settlement {
        let settled = self
            .rx
            .await
            .map_err(|_| ScraperError::configuration("scrape pipeline dropped before settling"))?;
        let mut value = settled?;
        for transform in self.transforms {
            value = transform(value)
                .map_err(|e| ScraperError::parse(&self.url, e.selector(), e))?;
        }
        Ok(value)
    }
}

impl std::future::IntoFuture for ScraperPromise {
    type Output = Settlement;
    type IntoFuture = BoxFuture<'static, Settlement>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}
