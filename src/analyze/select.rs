// src/analyze/select.rs
use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::analyze::eligibility;
use crate::analyze::scorer::{ScoredItem, Scorer};
use crate::config::FilterConfig;
use crate::ingest::types::ContentItem;

/// Per-source selection result with the counts behind it.
#[derive(Debug, Default)]
pub struct Selection {
    pub selected: Vec<ScoredItem>,
    pub ineligible: usize,
    pub below_threshold: usize,
    pub scored: usize,
}

/// Total order: score desc, engagement desc, earlier `created_at` first
/// (unknown dates last), then url.
pub fn compare_ranked(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.relevance_score()
        .total_cmp(&a.relevance_score())
        .then_with(|| b.item().engagement.cmp(&a.item().engagement))
        .then_with(|| match (a.item().created_at, b.item().created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.item().url.cmp(&b.item().url))
}

pub fn rank_and_truncate(mut items: Vec<ScoredItem>, max_items: usize) -> Vec<ScoredItem> {
    items.sort_by(compare_ranked);
    items.truncate(max_items);
    items
}

/// Eligibility → scoring → threshold → rank → quota, for one source.
pub async fn select(
    items: Vec<ContentItem>,
    config: &FilterConfig,
    scorer: &Scorer,
    now: DateTime<Utc>,
) -> Selection {
    let mut out = Selection::default();
    let mut passing = Vec::new();

    for item in items {
        if let Err(reason) = eligibility::check(&item, config, now) {
            tracing::debug!(url = %item.url, ?reason, "ineligible");
            out.ineligible += 1;
            continue;
        }
        let scored = scorer.score(item).await;
        out.scored += 1;
        if scored.relevance_score() >= config.relevance_threshold {
            passing.push(scored);
        } else {
            out.below_threshold += 1;
        }
    }

    out.selected = rank_and_truncate(passing, config.max_items_per_source);
    out
}
