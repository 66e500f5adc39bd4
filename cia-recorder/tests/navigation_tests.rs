//! Navigation preflight against a local HTTP server

use axum::{http::StatusCode, routing::get, Router};
use cia_recorder::navigation::{NavigationOutcome, Navigator, PLACEHOLDER_FILE_NAME};
use std::net::SocketAddr;

async fn server() -> SocketAddr {
    let app = Router::new()
        .route("/dashboard", get(|| async { "<html>dashboard</html>" }))
        .route("/down", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_reachable_page_is_primary() {
    let addr = server().await;
    let dir = tempfile::tempdir().unwrap();
    let navigator = Navigator::new(None, dir.path().to_path_buf(), "Demo");

    let url = format!("http://{}/dashboard", addr);
    let outcome = navigator.resolve(&url).await.unwrap();
    assert_eq!(outcome, NavigationOutcome::Primary { url });
}

#[tokio::test]
async fn test_error_status_uses_fallback_url() {
    let addr = server().await;
    let dir = tempfile::tempdir().unwrap();
    let fallback = format!("http://{}/dashboard", addr);
    let navigator = Navigator::new(Some(fallback.clone()), dir.path().to_path_buf(), "Demo");

    let outcome = navigator.resolve(&format!("http://{}/down", addr)).await.unwrap();
    match outcome {
        NavigationOutcome::Fallback { url, reason } => {
            assert_eq!(url, fallback);
            assert_eq!(reason, "HTTP 503");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_fallback_writes_placeholder() {
    let addr = server().await;
    let dir = tempfile::tempdir().unwrap();
    let navigator = Navigator::new(
        Some(format!("http://{}/down", addr)),
        dir.path().to_path_buf(),
        "Quarterly Demo",
    );

    let outcome = navigator.resolve(&format!("http://{}/missing", addr)).await.unwrap();
    assert!(outcome.is_fallback());
    assert!(outcome.url().starts_with("file://"));
    assert!(outcome.url().ends_with(PLACEHOLDER_FILE_NAME));

    let html = std::fs::read_to_string(dir.path().join(PLACEHOLDER_FILE_NAME)).unwrap();
    assert!(html.contains("Quarterly Demo"));
    assert!(html.contains("HTTP 404"));
}
