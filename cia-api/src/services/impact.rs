//! Impact scoring
//!
//! Turns an [`IntelligenceBundle`] into a risk score and an impact card.
//!
//! Score components (each capped, then summed and clamped to 0..=100):
//!
//! | Component        | Per unit | Cap |
//! |------------------|----------|-----|
//! | news volume      | 2        | 30  |
//! | keyword hits     | 4        | 20  |
//! | negative signals | 8        | 40  |
//! | research depth   | 1        | 10  |

use chrono::Utc;
use cia_common::db::{ImpactCard, WatchItem};
use cia_common::{RiskLevel, RiskScore};
use serde::Serialize;
use uuid::Uuid;

use super::orchestrator::{merge_sources, IntelligenceBundle};

const NEWS_WEIGHT: f64 = 2.0;
const NEWS_CAP: f64 = 30.0;
const KEYWORD_WEIGHT: f64 = 4.0;
const KEYWORD_CAP: f64 = 20.0;
const SIGNAL_WEIGHT: f64 = 8.0;
const SIGNAL_CAP: f64 = 40.0;
const RESEARCH_WEIGHT: f64 = 1.0;
const RESEARCH_CAP: f64 = 10.0;

/// Key events kept on a card
const MAX_KEY_EVENTS: usize = 5;

/// Headlines used for the fallback summary
const FALLBACK_HEADLINES: usize = 3;

/// Terms that mark a headline as a competitive threat
pub const DEFAULT_SIGNAL_TERMS: &[&str] = &[
    "acquires",
    "acquisition",
    "launch",
    "launches",
    "partnership",
    "funding",
    "raises",
    "price cut",
    "expansion",
    "expands",
    "lawsuit",
    "layoffs",
];

/// Score plus the breakdown that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: RiskScore,
    pub level: RiskLevel,
    pub news_count: usize,
    pub keyword_hits: usize,
    pub signal_hits: usize,
    pub research_sources: usize,
}

fn contains_any(text: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| !t.is_empty() && text.contains(t.as_str()))
}

fn lowered(terms: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    terms
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Score a bundle against the competitor's keywords and extra risk terms
pub fn score_bundle(
    bundle: &IntelligenceBundle,
    keywords: &[String],
    risk_terms: &[String],
) -> RiskAssessment {
    let keywords = lowered(keywords);
    let mut signals = lowered(DEFAULT_SIGNAL_TERMS.iter());
    signals.extend(lowered(risk_terms));

    let texts: Vec<String> = bundle
        .news
        .news
        .iter()
        .map(|a| format!("{} {}", a.title, a.description).to_lowercase())
        .collect();

    let news_count = texts.len();
    let keyword_hits = texts.iter().filter(|t| contains_any(t, &keywords)).count();
    let signal_hits = texts.iter().filter(|t| contains_any(t, &signals)).count();
    let research_sources = bundle.research.as_ref().map_or(0, |r| r.sources.len());

    let raw = (news_count as f64 * NEWS_WEIGHT).min(NEWS_CAP)
        + (keyword_hits as f64 * KEYWORD_WEIGHT).min(KEYWORD_CAP)
        + (signal_hits as f64 * SIGNAL_WEIGHT).min(SIGNAL_CAP)
        + (research_sources as f64 * RESEARCH_WEIGHT).min(RESEARCH_CAP);

    let score = RiskScore::clamped(raw);

    RiskAssessment {
        score,
        level: score.level(),
        news_count,
        keyword_hits,
        signal_hits,
        research_sources,
    }
}

fn summarize(item: &WatchItem, bundle: &IntelligenceBundle) -> String {
    let answer = bundle.agent.answer.trim();
    if !answer.is_empty() {
        return answer.to_string();
    }

    let headlines: Vec<&str> = bundle
        .news
        .news
        .iter()
        .map(|a| a.title.trim())
        .filter(|t| !t.is_empty())
        .take(FALLBACK_HEADLINES)
        .collect();

    if headlines.is_empty() {
        format!("No notable recent activity found for {}.", item.competitor_name)
    } else {
        format!("Recent activity for {}: {}", item.competitor_name, headlines.join("; "))
    }
}

/// Assemble an unsaved impact card for a watch item
pub fn build_impact_card(item: &WatchItem, bundle: &IntelligenceBundle) -> ImpactCard {
    let assessment = score_bundle(bundle, &item.keywords, &item.monitoring.risk_terms);

    let key_events = bundle
        .news
        .news
        .iter()
        .map(|a| a.title.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_KEY_EVENTS)
        .collect();

    let sources = merge_sources(
        bundle
            .news
            .news
            .iter()
            .map(|a| a.source_link())
            .chain(bundle.web.hits.iter().map(|h| h.source_link()))
            .chain(bundle.agent.sources.iter().cloned())
            .chain(bundle.research.iter().flat_map(|r| r.sources.iter().cloned())),
    );

    ImpactCard {
        id: Uuid::new_v4(),
        competitor_id: item.competitor_id,
        competitor_name: item.competitor_name.clone(),
        risk_score: assessment.score,
        risk_level: assessment.level,
        summary: summarize(item, bundle),
        key_events,
        sources,
        news_count: assessment.news_count as i64,
        created_at: Utc::now(),
    }
}
