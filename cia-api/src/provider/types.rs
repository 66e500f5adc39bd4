//! Provider response payloads
//!
//! Fields the provider may omit default to empty values so a sparse response
//! still decodes.

use cia_common::db::SourceLink;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub description: String,
    pub source: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsResults {
    pub news: Vec<NewsArticle>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebResults {
    pub hits: Vec<WebHit>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentAnswer {
    pub answer: String,
    pub sources: Vec<SourceLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResearchResult {
    pub summary: String,
    pub sources: Vec<SourceLink>,
}

impl NewsArticle {
    pub fn source_link(&self) -> SourceLink {
        SourceLink {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

impl WebHit {
    pub fn source_link(&self) -> SourceLink {
        SourceLink {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_payloads_decode() {
        let news: NewsResults =
            serde_json::from_str(r#"{"news": [{"title": "Acme raises prices"}]}"#).unwrap();
        assert_eq!(news.news.len(), 1);
        assert_eq!(news.news[0].url, "");
        assert!(news.news[0].published_at.is_none());

        let empty: WebResults = serde_json::from_str("{}").unwrap();
        assert!(empty.hits.is_empty());
    }
}
