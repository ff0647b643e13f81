// src/ingest/providers/reddit.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::matches_any_term;
use crate::ingest::providers::{collect_units, http_client, parse_each};
use crate::ingest::types::{RawRecord, RedditPost, SourceAdapter, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: serde_json::Value,
}

/// Parse a subreddit listing. Only posts mentioning one of `terms` in the
/// title or selftext are kept.
pub fn parse_listing(body: &str, terms: &[String]) -> Result<Vec<RawRecord>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;
    let values = listing.data.children.into_iter().map(|c| c.data).collect();
    let out: Vec<RawRecord> = parse_each(values, "reddit", RawRecord::Reddit)
        .into_iter()
        .filter(|r| match r {
            RawRecord::Reddit(p) => {
                matches_any_term(terms, p.title.as_deref().unwrap_or_default(), &p.selftext)
            }
            _ => false,
        })
        .collect();
    counter!("curator_raw_items_parsed_total", "source" => "reddit").increment(out.len() as u64);
    Ok(out)
}

/// Latest posts from configured subreddits, prefiltered by query terms.
pub struct RedditAdapter {
    name: String,
    base_url: String,
    subreddits: Vec<String>,
    limit: u32,
    min_score: i64,
    client: reqwest::Client,
}

impl RedditAdapter {
    pub fn new(name: impl Into<String>, subreddits: Vec<String>, min_score: i64) -> Self {
        Self {
            name: name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            subreddits,
            limit: 50,
            min_score,
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_limit(mut self, n: u32) -> Self {
        self.limit = n.clamp(1, 100);
        self
    }

    async fn latest(&self, subreddit: String, terms: &[String]) -> Result<Vec<RawRecord>> {
        let sub = subreddit.trim().trim_start_matches("r/");
        let url = format!("{}/r/{}/new.json", self.base_url.trim_end_matches('/'), sub);
        let body = self
            .client
            .get(&url)
            .query(&[("limit", self.limit.to_string())])
            .send()
            .await
            .with_context(|| format!("reddit get r/{sub}"))?
            .error_for_status()
            .context("reddit non-2xx")?
            .text()
            .await
            .context("reddit http .text()")?;
        parse_listing(&body, terms)
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }

    async fn collect(&self, query_terms: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        collect_units(&self.name, &self.subreddits, |sub| self.latest(sub, query_terms)).await
    }

    fn eligibility_filter(&self, raw: Vec<RawRecord>) -> Vec<RawRecord> {
        raw.into_iter()
            .filter(|r| match r {
                RawRecord::Reddit(RedditPost { score, .. }) => *score >= self.min_score,
                _ => true,
            })
            .collect()
    }
}
