//! Smoke check for the dynamic strategy against a live site.
//!
//! ```sh
//! cargo run -p strata-scrapers --features browser --example render_smoke
//! ```

use serde_json::json;
use strata_core::request::{ScrapeRequest, Strategy};
use strata_scrapers::browser_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let router = browser_router(1)?;
    let request = ScrapeRequest::new("https://example.com", Strategy::Dynamic, |doc| {
        Ok(json!({ "title": doc.first_text("h1")? }))
    });

    let data = router.dispatch(request).await?;
    println!("{data}");

    router.shutdown().await;
    Ok(())
}
