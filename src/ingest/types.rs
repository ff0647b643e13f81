// src/ingest/types.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Origin adapter identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Forum,
    CodeHost,
    SocialFeed,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Forum => "Forum",
            SourceKind::CodeHost => "CodeHost",
            SourceKind::SocialFeed => "SocialFeed",
        }
    }
}

/// Canonical unit of work produced by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub source: SourceKind,
    /// Adapter name, e.g. "hackernews" or "github".
    pub origin: String,
    pub title: String,
    /// Cleaned and truncated to `MAX_BODY_CHARS`.
    pub body: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub engagement: u64,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ContentItem {
    /// Text-typed `extra` lookup; empty when absent or not a string.
    pub fn extra_str(&self, key: &str) -> &str {
        self.extra
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// Short stable id for log lines: first 12 hex chars of sha256(url).
    pub fn short_id(&self) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(self.url.as_bytes());
        digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
    }
}

/// Hacker News (Algolia) search hit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HnHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub story_text: Option<String>,
    pub points: Option<i64>,
    pub num_comments: Option<i64>,
    pub created_at_i: Option<i64>,
    pub author: Option<String>,
}

/// Reddit listing child (`data` object).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RedditPost {
    pub title: Option<String>,
    #[serde(default)]
    pub selftext: String,
    pub permalink: Option<String>,
    #[serde(default)]
    pub score: i64,
    pub created_utc: Option<f64>,
    pub subreddit: Option<String>,
    pub num_comments: Option<i64>,
}

/// GitHub repository search result, with the README fetched separately.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GitHubRepo {
    pub full_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub html_url: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    pub language: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(skip)]
    pub readme: String,
}

/// One RSS item or Atom entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub feed: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// Raw per-source record, converged into `ContentItem` by `ingest::normalize`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    HackerNews(HnHit),
    Reddit(RedditPost),
    GitHub(GitHubRepo),
    Feed(FeedEntry),
}

impl RawRecord {
    /// Best-effort locator used for in-adapter dedup before normalization.
    pub fn locator(&self) -> Option<String> {
        match self {
            RawRecord::HackerNews(h) => h
                .url
                .clone()
                .or_else(|| Some(format!("hn:{}", h.object_id))),
            RawRecord::Reddit(r) => r.permalink.clone(),
            RawRecord::GitHub(g) => Some(g.full_name.clone()),
            RawRecord::Feed(f) => f.link.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> SourceKind;

    /// Fetch raw records for the given query terms. Malformed records are
    /// skipped; only a terminal failure is returned as an error.
    async fn collect(&self, query_terms: &[String]) -> Result<Vec<RawRecord>, SourceError>;

    /// Cheap source-native checks (e.g. minimum points). Defaults to keeping all.
    fn eligibility_filter(&self, raw: Vec<RawRecord>) -> Vec<RawRecord> {
        raw
    }
}
