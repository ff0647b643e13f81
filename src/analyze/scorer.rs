// src/analyze/scorer.rs
//! Two-stage relevance scorer: keyword heuristic, then an optional oracle
//! refinement that falls back to the heuristic on any failure.

use std::time::Duration;

use metrics::counter;
use serde::Deserialize;

use crate::analyze::ai_adapter::{CompletionRequest, DynOracle};
use crate::analyze::heuristic::{heuristic_score, HeuristicScore, KeywordSet};
use crate::error::FallbackReason;
use crate::ingest::types::ContentItem;

const RUBRIC_MAX: f64 = 10.0;

const SCORING_SYSTEM: &str = "You evaluate content for relevance to AI agent technology and development. \
Respond with a single JSON object and nothing else.";

/// How the final score was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreBasis {
    /// No oracle configured.
    Heuristic,
    Oracle,
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceScore {
    /// Final score in [0, 1].
    pub value: f32,
    pub heuristic: f32,
    pub basis: ScoreBasis,
}

/// An item that went through eligibility and scoring. The score cannot be
/// changed once assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    item: ContentItem,
    relevance: RelevanceScore,
}

impl ScoredItem {
    pub(crate) fn new(item: ContentItem, relevance: RelevanceScore) -> Self {
        Self { item, relevance }
    }

    pub fn item(&self) -> &ContentItem {
        &self.item
    }

    pub fn relevance(&self) -> &RelevanceScore {
        &self.relevance
    }

    pub fn relevance_score(&self) -> f32 {
        self.relevance.value
    }

    pub fn into_item(self) -> ContentItem {
        self.item
    }
}

#[derive(Debug, Deserialize)]
struct RubricScores {
    technical_score: f64,
    practical_score: f64,
    timeliness_score: f64,
    quality_score: f64,
    final_score: f64,
}

/// Strictly parse the oracle's rubric reply. Code fences and surrounding
/// prose are tolerated; anything else that is not a complete in-range rubric
/// is a fallback reason.
pub fn parse_oracle_score(text: &str) -> Result<f32, FallbackReason> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &text[s..=e],
        _ => return Err(FallbackReason::Malformed("no JSON object".into())),
    };
    let r: RubricScores =
        serde_json::from_str(json).map_err(|e| FallbackReason::Malformed(e.to_string()))?;

    for v in [
        r.technical_score,
        r.practical_score,
        r.timeliness_score,
        r.quality_score,
    ] {
        if !v.is_finite() || !(0.0..=RUBRIC_MAX).contains(&v) {
            return Err(FallbackReason::OutOfRange(v));
        }
    }
    if !r.final_score.is_finite() || !(0.0..=1.0).contains(&r.final_score) {
        return Err(FallbackReason::OutOfRange(r.final_score));
    }
    Ok(r.final_score as f32)
}

fn format_date(item: &ContentItem) -> String {
    item.created_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "No date".to_string())
}

pub fn scoring_prompt(item: &ContentItem) -> CompletionRequest {
    let prompt = format!(
        "Analyze the following content's relevance to AI technology and development.

Content to analyze:
Title: {title}
Description: {body}
Date: {date}

Evaluate based on these criteria, each scored 0-10:
1. Technical Innovation: novel AI approaches, implementation details, research insights.
2. Practical Application: real-world use cases, implementation examples, industry impact.
3. Timeliness: current relevance, future potential, trend alignment.
4. Quality & Credibility: information depth, source reliability, technical accuracy.

Return only a JSON object:
{{\"technical_score\": X, \"practical_score\": X, \"timeliness_score\": X, \"quality_score\": X, \"final_score\": X.X}}
where final_score is normalized to the 0-1 range.",
        title = item.title,
        body = item.body,
        date = format_date(item),
    );
    CompletionRequest {
        system: SCORING_SYSTEM.to_string(),
        prompt,
        max_tokens: 200,
        temperature: 0.0,
    }
}

pub struct Scorer {
    keywords: KeywordSet,
    oracle: Option<DynOracle>,
    oracle_timeout: Duration,
}

impl Scorer {
    pub fn heuristic_only(keywords: KeywordSet) -> Self {
        Self {
            keywords,
            oracle: None,
            oracle_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_oracle(mut self, oracle: DynOracle, timeout: Duration) -> Self {
        self.oracle = Some(oracle);
        self.oracle_timeout = timeout;
        self
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn heuristic(&self, item: &ContentItem) -> HeuristicScore {
        heuristic_score(&self.keywords, item)
    }

    /// Oracle stage alone, as a typed outcome.
    pub async fn oracle_score(&self, item: &ContentItem) -> Result<f32, FallbackReason> {
        let Some(oracle) = &self.oracle else {
            return Err(FallbackReason::Disabled);
        };
        let req = scoring_prompt(item);
        match tokio::time::timeout(self.oracle_timeout, oracle.complete(&req)).await {
            Err(_) => Err(FallbackReason::Timeout),
            Ok(Err(e)) => Err(FallbackReason::CallFailed(e.to_string())),
            Ok(Ok(text)) => parse_oracle_score(&text),
        }
    }

    /// Score an eligible item. Never fails: oracle problems fall back to the
    /// heuristic score.
    pub async fn score(&self, item: ContentItem) -> ScoredItem {
        let h = self.heuristic(&item);
        let relevance = if self.oracle.is_none() {
            RelevanceScore {
                value: h.score,
                heuristic: h.score,
                basis: ScoreBasis::Heuristic,
            }
        } else {
            match self.oracle_score(&item).await {
                Ok(v) => RelevanceScore {
                    value: v,
                    heuristic: h.score,
                    basis: ScoreBasis::Oracle,
                },
                Err(reason) => {
                    tracing::warn!(url = %item.url, %reason, heuristic = h.score, "oracle scoring fell back to heuristic");
                    counter!("curator_oracle_fallbacks_total").increment(1);
                    RelevanceScore {
                        value: h.score,
                        heuristic: h.score,
                        basis: ScoreBasis::Fallback(reason),
                    }
                }
            }
        };
        tracing::debug!(
            target: "relevance",
            url = %item.url,
            score = relevance.value,
            matched = ?h.matched,
            "scored"
        );
        ScoredItem::new(item, relevance)
    }
}
