// src/analyze/heuristic.rs
//! Keyword heuristic: the fast, deterministic scoring stage.
//!
//! `score = min(0.2 * distinct_hits, 0.6) + 0.3 if any keyword is in the title`,
//! capped at 1.0. Matching is case-insensitive substring search over title + body.

use crate::ingest::types::ContentItem;

const PER_HIT: f32 = 0.2;
const HIT_CAP: f32 = 0.6;
const TITLE_BONUS: f32 = 0.3;

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "ai agent",
    "autonomous agent",
    "multi-agent",
    "agentic",
    "agent framework",
    "llm",
    "language model",
    "ai assistant",
    "autonomous system",
    "orchestration",
];

/// Lowercased, deduplicated topical keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for k in keywords {
            let k = k.as_ref().trim().to_lowercase();
            if !k.is_empty() && !out.contains(&k) {
                out.push(k);
            }
        }
        Self { keywords: out }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Heuristic result with the matched keywords kept for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicScore {
    pub score: f32,
    pub matched: Vec<String>,
    pub title_hit: bool,
}

pub fn heuristic_score(keywords: &KeywordSet, item: &ContentItem) -> HeuristicScore {
    let title = item.title.to_lowercase();
    let text = format!("{} {}", title, item.body.to_lowercase());

    let matched: Vec<String> = keywords
        .keywords()
        .iter()
        .filter(|k| text.contains(k.as_str()))
        .cloned()
        .collect();
    let title_hit = matched.iter().any(|k| title.contains(k.as_str()));

    let hits = (PER_HIT * matched.len() as f32).min(HIT_CAP);
    let bonus = if title_hit { TITLE_BONUS } else { 0.0 };
    HeuristicScore {
        score: (hits + bonus).clamp(0.0, 1.0),
        matched,
        title_hit,
    }
}
