//! End-to-end tests for the dynamic strategy. These launch a real headless
//! Chromium session and are ignored by default; run them with
//! `cargo test --features browser -- --ignored` on a machine with Chrome
//! (or set `CHROME_BIN`).

use serde_json::json;

use strata_core::request::{ScrapeRequest, Strategy};
use strata_scrapers::browser_router;

use crate::common::spawn_fixture;

fn headline_request(url: String, strategy: Strategy) -> ScrapeRequest {
    ScrapeRequest::new(url, strategy, |doc| {
        Ok(json!(doc.first_text("h1.headline")?))
    })
}

#[tokio::test]
#[ignore = "requires a Chrome/Chromium binary"]
async fn static_and_dynamic_agree_on_script_free_content() {
    let addr = spawn_fixture().await;
    let router = browser_router(1).unwrap();
    let url = format!("http://{addr}/article.html");

    let static_data = router
        .dispatch(headline_request(url.clone(), Strategy::Static))
        .await
        .unwrap();
    let dynamic_data = router
        .dispatch(headline_request(url, Strategy::Dynamic))
        .await
        .unwrap();

    assert_eq!(static_data, dynamic_data);
    router.shutdown().await;
}

#[tokio::test]
#[ignore = "requires a Chrome/Chromium binary"]
async fn dynamic_sees_script_produced_content_where_static_does_not() {
    let addr = spawn_fixture().await;
    let router = browser_router(1).unwrap();
    let url = format!("http://{addr}/script.html");

    let dynamic_data = router
        .dispatch(headline_request(url.clone(), Strategy::Dynamic))
        .await
        .unwrap();
    assert_eq!(dynamic_data, json!("Rendered Headline"));

    let static_result = router
        .dispatch(headline_request(url, Strategy::Static))
        .await;
    assert!(
        static_result.is_err(),
        "static strategy must not see script output"
    );
    router.shutdown().await;
}
