use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::get;

/// A script-free article page; static and dynamic extraction must agree on it.
pub const ARTICLE_HTML: &str = r#"<html>
<head><title>Fixture Article</title></head>
<body>
  <h1 class="headline">Fixture Headline</h1>
  <ul id="tags"><li>rust</li><li>scraping</li></ul>
</body>
</html>"#;

/// A page whose headline only exists after script execution.
pub const SCRIPT_HTML: &str = r#"<html>
<head><title>Rendered Fixture</title></head>
<body>
  <div id="app"></div>
  <script>
    var h = document.createElement("h1");
    h.className = "headline";
    h.textContent = "Rendered Headline";
    document.getElementById("app").appendChild(h);
  </script>
</body>
</html>"#;

/// Serve the fixture pages on an ephemeral local port.
pub async fn spawn_fixture() -> SocketAddr {
    let app = axum::Router::new()
        .route("/article.html", get(|| async { Html(ARTICLE_HTML) }))
        .route("/script.html", get(|| async { Html(SCRIPT_HTML) }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                Html(ARTICLE_HTML)
            }),
        )
        .route(
            "/header-echo",
            get(|headers: HeaderMap| async move {
                let value = headers
                    .get("x-strata-test")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Html(format!("<html><body><p id=\"echo\">{value}</p></body></html>"))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind fixture server");
    let addr = listener.local_addr().expect("failed to read fixture addr");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("fixture server failed");
    });
    addr
}
