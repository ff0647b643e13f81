// src/ingest/providers/hackernews.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::providers::{collect_units, http_client, parse_each};
use crate::ingest::types::{HnHit, RawRecord, SourceAdapter, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://hn.algolia.com/api/v1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<serde_json::Value>,
}

/// Parse an Algolia search response body; malformed hits are skipped.
pub fn parse_search_response(body: &str) -> Result<Vec<RawRecord>> {
    let resp: SearchResponse = serde_json::from_str(body).context("parsing hn search json")?;
    let out = parse_each(resp.hits, "hackernews", RawRecord::HackerNews);
    counter!("curator_raw_items_parsed_total", "source" => "hackernews").increment(out.len() as u64);
    Ok(out)
}

/// Hacker News stories via the Algolia search API.
pub struct HackerNewsAdapter {
    name: String,
    base_url: String,
    hits_per_query: u32,
    min_points: i64,
    client: reqwest::Client,
}

impl HackerNewsAdapter {
    pub fn new(name: impl Into<String>, min_points: i64) -> Self {
        Self {
            name: name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            hits_per_query: 20,
            min_points,
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_hits_per_query(mut self, n: u32) -> Self {
        self.hits_per_query = n.max(1);
        self
    }

    async fn search(&self, term: String) -> Result<Vec<RawRecord>> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let per_page = self.hits_per_query.to_string();
        let body = self
            .client
            .get(&url)
            .query(&[
                ("query", term.as_str()),
                ("tags", "story"),
                ("hitsPerPage", per_page.as_str()),
            ])
            .send()
            .await
            .context("hn http get()")?
            .error_for_status()
            .context("hn non-2xx")?
            .text()
            .await
            .context("hn http .text()")?;
        parse_search_response(&body)
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }

    async fn collect(&self, query_terms: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        collect_units(&self.name, query_terms, |term| self.search(term)).await
    }

    fn eligibility_filter(&self, raw: Vec<RawRecord>) -> Vec<RawRecord> {
        raw.into_iter()
            .filter(|r| match r {
                RawRecord::HackerNews(HnHit { points, .. }) => {
                    points.unwrap_or(0) >= self.min_points
                }
                _ => true,
            })
            .collect()
    }
}
