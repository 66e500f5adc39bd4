//! HttpProvider against a local mock of the provider API

use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use cia_api::provider::{HttpProvider, HttpProviderConfig, IntelligenceProvider, ProviderError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

const API_KEY: &str = "test-key";

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

async fn news(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
    }
    let count: usize = params.get("count").and_then(|c| c.parse().ok()).unwrap_or(0);
    let query = params.get("q").cloned().unwrap_or_default();
    let news: Vec<Value> = (0..count)
        .map(|i| json!({ "title": format!("{} story {}", query, i), "url": format!("https://n.example/{}", i) }))
        .collect();
    (StatusCode::OK, Json(json!({ "news": news })))
}

async fn agent(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({})));
    }
    let input = body["input"].as_str().unwrap_or_default().to_string();
    (StatusCode::OK, Json(json!({ "answer": format!("echo: {}", input) })))
}

async fn mock_server() -> SocketAddr {
    let app = Router::new()
        .route("/v1/news", get(news))
        .route("/v1/search", get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }))
        .route("/v1/agents/runs", post(agent))
        .route("/v1/research", post(|| async { "not json" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, api_key: &str) -> HttpProvider {
    HttpProvider::new(HttpProviderConfig {
        base_url: format!("http://{}", addr),
        api_key: Some(api_key.to_string()),
        timeout: Duration::from_secs(5),
        min_interval_ms: 0,
    })
    .unwrap()
}

#[tokio::test]
async fn test_news_query_and_auth_header() {
    let addr = mock_server().await;
    let provider = client(addr, API_KEY);

    let results = provider.search_news("Acme", 3).await.unwrap();
    assert_eq!(results.news.len(), 3);
    assert_eq!(results.news[0].title, "Acme story 0");
}

#[tokio::test]
async fn test_agent_posts_input() {
    let addr = mock_server().await;
    let provider = client(addr, API_KEY);

    let answer = provider.agent_answer("what changed?").await.unwrap();
    assert_eq!(answer.answer, "echo: what changed?");
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn test_status_mapping() {
    let addr = mock_server().await;

    let wrong_key = client(addr, "nope");
    assert!(matches!(
        wrong_key.search_news("Acme", 1).await,
        Err(ProviderError::Unauthorized(401))
    ));
    assert!(matches!(
        wrong_key.agent_answer("hi").await,
        Err(ProviderError::Unauthorized(403))
    ));

    let provider = client(addr, API_KEY);
    assert!(matches!(
        provider.search_web("Acme", 1).await,
        Err(ProviderError::RateLimited)
    ));
    assert!(matches!(
        provider.deep_research("Acme").await,
        Err(ProviderError::Parse(_))
    ));
}

#[tokio::test]
async fn test_unreachable_provider_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = client(addr, API_KEY);
    assert!(matches!(
        provider.search_news("Acme", 1).await,
        Err(ProviderError::Network(_))
    ));
}
