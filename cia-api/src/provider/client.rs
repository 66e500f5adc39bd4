//! HTTP client for the intelligence provider
//!
//! Requests are authenticated with an `X-API-Key` header and spaced by a
//! minimum interval. A failed request is reported once; this client never
//! retries.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{
    AgentAnswer, IntelligenceProvider, NewsResults, ProviderEndpoint, ProviderError,
    ResearchResult, WebResults,
};

const USER_AGENT: &str = concat!("EnterpriseCIA/", env!("CARGO_PKG_VERSION"));

/// Enforces a minimum gap between consecutive requests
struct RequestSpacer {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RequestSpacer {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary so requests are at least `min_interval` apart
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Provider request spacing: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Connection settings for [`HttpProvider`]
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub min_interval_ms: u64,
}

/// reqwest-backed [`IntelligenceProvider`]
pub struct HttpProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    spacer: Arc<RequestSpacer>,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            spacer: Arc::new(RequestSpacer::new(config.min_interval_ms)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticate, space, send and decode one request
    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: ProviderEndpoint,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;

        self.spacer.wait().await;

        tracing::debug!(endpoint = %endpoint, "Calling provider");

        let response = request
            .header("X-API-Key", api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %endpoint, status = status.as_u16(), "Provider returned error status");
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl IntelligenceProvider for HttpProvider {
    async fn search_news(&self, query: &str, count: u32) -> Result<NewsResults, ProviderError> {
        let request = self
            .http_client
            .get(self.url("/v1/news"))
            .query(&[("q", query.to_string()), ("count", count.to_string())]);

        let results: NewsResults = self.execute(ProviderEndpoint::News, request).await?;
        tracing::info!(query = %query, articles = results.news.len(), "Retrieved news from provider");
        Ok(results)
    }

    async fn search_web(&self, query: &str, count: u32) -> Result<WebResults, ProviderError> {
        let request = self
            .http_client
            .get(self.url("/v1/search"))
            .query(&[("q", query.to_string()), ("count", count.to_string())]);

        let results: WebResults = self.execute(ProviderEndpoint::Search, request).await?;
        tracing::info!(query = %query, hits = results.hits.len(), "Retrieved web results from provider");
        Ok(results)
    }

    async fn agent_answer(&self, prompt: &str) -> Result<AgentAnswer, ProviderError> {
        let request = self
            .http_client
            .post(self.url("/v1/agents/runs"))
            .json(&json!({ "input": prompt, "stream": false }));

        self.execute(ProviderEndpoint::Agent, request).await
    }

    async fn deep_research(&self, query: &str) -> Result<ResearchResult, ProviderError> {
        let request = self
            .http_client
            .post(self.url("/v1/research"))
            .json(&json!({ "query": query }));

        let result: ResearchResult = self.execute(ProviderEndpoint::Research, request).await?;
        tracing::info!(query = %query, sources = result.sources.len(), "Deep research completed");
        Ok(result)
    }
}
