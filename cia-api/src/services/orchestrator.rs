//! Provider call orchestration
//!
//! A fixed call graph over the four provider endpoints:
//!
//! ```text
//! news ─┐
//!       ├─> agent summary ─> deep research (optional)
//! web  ─┘
//! ```
//!
//! News and web search run concurrently. The first failure aborts the whole
//! bundle and is surfaced to the caller as-is.

use chrono::Utc;
use cia_common::db::{ImpactCard, ResearchReport, SourceLink, WatchItem};
use cia_common::events::{CiaEvent, EventBus};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

use super::{impact, usage};
use crate::db::{impact_cards, reports, watch_items};
use crate::error::{ApiError, ApiResult};
use crate::provider::{
    AgentAnswer, IntelligenceProvider, NewsResults, ProviderEndpoint, ResearchResult, WebResults,
};

/// Keywords beyond this many are left out of provider queries
const MAX_QUERY_KEYWORDS: usize = 5;

/// Headlines included in the agent prompt
const MAX_PROMPT_HEADLINES: usize = 8;

/// Web results requested alongside company research
const RESEARCH_WEB_COUNT: u32 = 10;

/// Everything gathered for one competitor in one pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntelligenceBundle {
    pub query: String,
    pub news: NewsResults,
    pub web: WebResults,
    pub agent: AgentAnswer,
    pub research: Option<ResearchResult>,
}

/// Build the provider search query from a competitor name and its keywords
pub fn build_query(name: &str, keywords: &[String]) -> String {
    let mut parts = vec![name.trim().to_string()];
    parts.extend(
        keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .take(MAX_QUERY_KEYWORDS)
            .map(str::to_string),
    );
    parts.join(" ")
}

fn agent_prompt(name: &str, news: &NewsResults) -> String {
    let mut prompt = format!(
        "Summarize in two or three sentences what the following recent developments mean \
         competitively for {}.",
        name
    );
    if news.news.is_empty() {
        prompt.push_str(" No recent headlines were found; summarize its current market position.");
    } else {
        prompt.push_str("\nHeadlines:");
        for article in news.news.iter().take(MAX_PROMPT_HEADLINES) {
            prompt.push_str("\n- ");
            prompt.push_str(&article.title);
        }
    }
    prompt
}

/// Merge source lists, dropping duplicate and empty URLs, first occurrence wins
pub fn merge_sources<I>(sources: I) -> Vec<SourceLink>
where
    I: IntoIterator<Item = SourceLink>,
{
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| !s.url.is_empty() && seen.insert(s.url.clone()))
        .collect()
}

/// Runs provider calls and persists what they produce
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn IntelligenceProvider>,
    db: SqlitePool,
    events: EventBus,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn IntelligenceProvider>, db: SqlitePool, events: EventBus) -> Self {
        Self { provider, db, events }
    }

    /// Gather news, web results, an agent summary and (if enabled) deep research
    pub async fn gather_intelligence(&self, item: &WatchItem) -> ApiResult<IntelligenceBundle> {
        let query = build_query(&item.competitor_name, &item.keywords);
        let monitoring = &item.monitoring;

        tracing::debug!(competitor = %item.competitor_name, query = %query, "Gathering intelligence");

        let (news, web) = tokio::try_join!(
            usage::track(
                &self.db,
                &self.events,
                ProviderEndpoint::News,
                self.provider.search_news(&query, monitoring.news_count),
            ),
            usage::track(
                &self.db,
                &self.events,
                ProviderEndpoint::Search,
                self.provider.search_web(&query, monitoring.search_count),
            ),
        )?;

        let prompt = agent_prompt(&item.competitor_name, &news);
        let agent = usage::track(
            &self.db,
            &self.events,
            ProviderEndpoint::Agent,
            self.provider.agent_answer(&prompt),
        )
        .await?;

        let research = if monitoring.deep_research {
            Some(
                usage::track(
                    &self.db,
                    &self.events,
                    ProviderEndpoint::Research,
                    self.provider.deep_research(&item.competitor_name),
                )
                .await?,
            )
        } else {
            None
        };

        Ok(IntelligenceBundle {
            query,
            news,
            web,
            agent,
            research,
        })
    }

    /// Gather, score, persist and announce a new impact card, then record the
    /// check on the watch item. A failure is recorded as the item's last error.
    pub async fn generate_impact_card(&self, item: &WatchItem) -> ApiResult<ImpactCard> {
        let outcome = self.try_generate(item).await;

        let error = outcome.as_ref().err().map(|e| e.to_string());
        if let Err(e) = watch_items::mark_checked(&self.db, item.id, error.as_deref()).await {
            tracing::warn!(watch_item_id = %item.id, error = %e, "Failed to record watch item check");
        }

        outcome
    }

    async fn try_generate(&self, item: &WatchItem) -> ApiResult<ImpactCard> {
        let bundle = self.gather_intelligence(item).await?;
        let card = impact::build_impact_card(item, &bundle);

        impact_cards::save(&self.db, &card).await?;

        self.events.emit_lossy(CiaEvent::ImpactCardCreated {
            impact_card_id: card.id,
            competitor_id: card.competitor_id,
            competitor_name: card.competitor_name.clone(),
            risk_score: card.risk_score.value(),
            risk_level: card.risk_level,
            timestamp: Utc::now(),
        });

        Ok(card)
    }

    /// Deep research on a company plus a web search for corroborating sources,
    /// persisted as a research report
    pub async fn research_company(&self, company_name: &str) -> ApiResult<ResearchReport> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(ApiError::BadRequest("company_name must not be empty".to_string()));
        }

        let (research, web) = tokio::try_join!(
            usage::track(
                &self.db,
                &self.events,
                ProviderEndpoint::Research,
                self.provider.deep_research(company_name),
            ),
            usage::track(
                &self.db,
                &self.events,
                ProviderEndpoint::Search,
                self.provider.search_web(company_name, RESEARCH_WEB_COUNT),
            ),
        )?;

        let sources = merge_sources(
            research
                .sources
                .into_iter()
                .chain(web.hits.iter().map(|hit| hit.source_link())),
        );

        let report = reports::save(
            &self.db,
            company_name,
            &research.summary,
            &sources,
            sources.len() as i64,
        )
        .await?;

        self.events.emit_lossy(CiaEvent::ResearchCompleted {
            report_id: report.id,
            company_name: report.company_name.clone(),
            source_count: report.source_count,
            timestamp: report.completed_at,
        });

        Ok(report)
    }
}
