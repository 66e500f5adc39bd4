//! Intelligence provider integration
//!
//! The provider exposes four logical endpoints: news search, web search, a
//! conversational agent and deep research. Everything above this module talks
//! to the `IntelligenceProvider` trait so tests can substitute a canned
//! implementation for the HTTP client.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpProvider, HttpProviderConfig};
pub use error::ProviderError;
pub use types::{AgentAnswer, NewsArticle, NewsResults, ResearchResult, WebHit, WebResults};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical provider endpoint, used for usage accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderEndpoint {
    News,
    Search,
    Agent,
    Research,
}

impl ProviderEndpoint {
    pub const ALL: [ProviderEndpoint; 4] = [
        ProviderEndpoint::News,
        ProviderEndpoint::Search,
        ProviderEndpoint::Agent,
        ProviderEndpoint::Research,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEndpoint::News => "news",
            ProviderEndpoint::Search => "search",
            ProviderEndpoint::Agent => "agent",
            ProviderEndpoint::Research => "research",
        }
    }
}

impl fmt::Display for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability interface over the third-party intelligence service
#[async_trait]
pub trait IntelligenceProvider: Send + Sync {
    /// Recent news articles matching `query`
    async fn search_news(&self, query: &str, count: u32) -> Result<NewsResults, ProviderError>;

    /// Web search results matching `query`
    async fn search_web(&self, query: &str, count: u32) -> Result<WebResults, ProviderError>;

    /// One-shot conversational answer to `prompt`
    async fn agent_answer(&self, prompt: &str) -> Result<AgentAnswer, ProviderError>;

    /// Multi-source research synthesis on `query`
    async fn deep_research(&self, query: &str) -> Result<ResearchResult, ProviderError>;
}
