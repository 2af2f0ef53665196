use std::time::Duration;

use serde_json::json;

use strata_core::error::{Phase, ScraperError};
use strata_core::request::{ScrapeOptions, ScrapeRequest, Strategy};
use strata_scrapers::default_router;

use crate::common::spawn_fixture;

fn article_request(url: String) -> ScrapeRequest {
    ScrapeRequest::new(url, Strategy::Static, |doc| {
        Ok(json!({
            "headline": doc.first_text("h1.headline")?,
            "tags": doc.all_texts("#tags li")?,
        }))
    })
}

#[tokio::test]
async fn static_dispatch_extracts_structured_data() {
    let addr = spawn_fixture().await;
    let router = default_router().unwrap();

    let data = router
        .dispatch(article_request(format!("http://{addr}/article.html")))
        .await
        .unwrap();

    assert_eq!(
        data,
        json!({"headline": "Fixture Headline", "tags": ["rust", "scraping"]})
    );
    router.shutdown().await;
}

#[tokio::test]
async fn http_404_is_a_navigation_error_not_a_parse_error() {
    let addr = spawn_fixture().await;
    let router = default_router().unwrap();

    let err = router
        .dispatch(article_request(format!("http://{addr}/missing")))
        .await
        .unwrap_err();

    match err {
        ScraperError::Navigation { cause, .. } => assert!(cause.contains("404"), "{cause}"),
        other => panic!("expected navigation error, got {other}"),
    }
}

#[tokio::test]
async fn deadline_below_response_time_times_out_in_the_load_phase() {
    let addr = spawn_fixture().await;
    let router = default_router().unwrap();

    let request = article_request(format!("http://{addr}/slow"))
        .with_options(ScrapeOptions::default().with_timeout(Duration::from_millis(100)));
    let err = router.dispatch(request).await.unwrap_err();

    match err {
        ScraperError::Timeout { phase, .. } => assert_eq!(phase, Phase::Load),
        other => panic!("expected timeout, got {other}"),
    }
}

#[tokio::test]
async fn custom_headers_reach_the_target() {
    let addr = spawn_fixture().await;
    let router = default_router().unwrap();

    let request = ScrapeRequest::new(
        format!("http://{addr}/header-echo"),
        Strategy::Static,
        |doc| Ok(json!(doc.first_text("#echo")?)),
    )
    .with_options(ScrapeOptions::default().with_header("x-strata-test", "present"));

    let data = router.dispatch(request).await.unwrap();
    assert_eq!(data, json!("present"));
}

#[tokio::test]
async fn concurrent_static_dispatches_all_complete() {
    let addr = spawn_fixture().await;
    let router = default_router().unwrap();

    let promises: Vec<_> = (0..8)
        .map(|_| router.dispatch(article_request(format!("http://{addr}/article.html"))))
        .collect();
    let results = futures::future::join_all(promises.into_iter().map(|p| p.wait())).await;

    assert!(results.iter().all(Result::is_ok));
}

#[tokio::test]
async fn extractor_failure_surfaces_the_selector() {
    let addr = spawn_fixture().await;
    let router = default_router().unwrap();

    let request = ScrapeRequest::new(
        format!("http://{addr}/article.html"),
        Strategy::Static,
        |doc| Ok(json!(doc.first_text("h2.absent")?)),
    );
    let err = router.dispatch(request).await.unwrap_err();

    match err {
        ScraperError::Parse { selector, .. } => assert_eq!(selector.as_deref(), Some("h2.absent")),
        other => panic!("expected parse error, got {other}"),
    }
}

#[tokio::test]
async fn dynamic_requests_are_rejected_without_a_browser_pool() {
    // default_router registers the static pool only.
    let router = default_router().unwrap();
    let request = ScrapeRequest::new("http://localhost/any", Strategy::Dynamic, |_| {
        Ok(serde_json::Value::Null)
    });
    let err = router.dispatch(request).await.unwrap_err();
    assert!(matches!(err, ScraperError::Configuration { .. }));
}
