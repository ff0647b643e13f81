// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::json;

use crate::error::NormalizeError;
use crate::ingest::types::{ContentItem, RawRecord, SourceKind};

/// Bodies are truncated to this many characters before scoring or storage.
pub const MAX_BODY_CHARS: usize = 1000;

/// Titles longer than this are cut; real titles never get close.
const MAX_TITLE_CHARS: usize = 300;

/// Clean text: decode entities, strip tags, fold typographic quotes,
/// collapse whitespace, trim, then cap at `max_chars` characters.
pub fn clean_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

/// Per-source fields handed to `finish` for cleaning and validation.
struct Draft<'a> {
    source: SourceKind,
    origin: &'a str,
    title: &'a str,
    body: &'a str,
    url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    engagement: u64,
    extra: BTreeMap<String, serde_json::Value>,
}

fn finish(draft: Draft<'_>) -> Result<ContentItem, NormalizeError> {
    let Draft {
        source,
        origin,
        title,
        body,
        url,
        created_at,
        engagement,
        extra,
    } = draft;
    let title = clean_text(title, MAX_TITLE_CHARS);
    let body = clean_text(body, MAX_BODY_CHARS);
    if title.is_empty() && body.is_empty() {
        return Err(NormalizeError::Empty);
    }
    let url = url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or(NormalizeError::MissingUrl)?;
    Ok(ContentItem {
        source,
        origin: origin.to_string(),
        title,
        body,
        url,
        created_at,
        engagement,
        extra,
    })
}

/// Map one raw record into the canonical item. Missing optional fields take
/// their defaults: empty text, zero engagement, unknown date.
pub fn normalize(raw: RawRecord) -> Result<ContentItem, NormalizeError> {
    match raw {
        RawRecord::HackerNews(hit) => {
            let url = hit.url.clone().filter(|u| !u.trim().is_empty()).or_else(|| {
                Some(format!(
                    "https://news.ycombinator.com/item?id={}",
                    hit.object_id
                ))
            });
            let mut extra = BTreeMap::new();
            extra.insert("hn_id".into(), json!(hit.object_id));
            if let Some(n) = hit.num_comments {
                extra.insert("num_comments".into(), json!(n));
            }
            if let Some(a) = &hit.author {
                extra.insert("author".into(), json!(a));
            }
            finish(Draft {
                source: SourceKind::Forum,
                origin: "hackernews",
                title: hit.title.as_deref().unwrap_or_default(),
                body: hit.story_text.as_deref().unwrap_or_default(),
                url,
                created_at: hit.created_at_i.and_then(from_unix),
                engagement: hit.points.unwrap_or(0).max(0) as u64,
                extra,
            })
        }
        RawRecord::Reddit(post) => {
            let url = post
                .permalink
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(|p| format!("https://reddit.com{p}"));
            let mut extra = BTreeMap::new();
            if let Some(s) = &post.subreddit {
                extra.insert("subreddit".into(), json!(s));
            }
            if let Some(n) = post.num_comments {
                extra.insert("num_comments".into(), json!(n));
            }
            finish(Draft {
                source: SourceKind::Forum,
                origin: "reddit",
                title: post.title.as_deref().unwrap_or_default(),
                body: &post.selftext,
                url,
                created_at: post.created_utc.and_then(|t| from_unix(t as i64)),
                engagement: post.score.max(0) as u64,
                extra,
            })
        }
        RawRecord::GitHub(repo) => {
            let description = repo.description.as_deref().unwrap_or_default();
            let body = if repo.readme.trim().is_empty() {
                description.to_string()
            } else {
                format!("{description}\n\nREADME:\n{}", repo.readme)
            };
            let url = repo
                .html_url
                .clone()
                .or_else(|| Some(format!("https://github.com/{}", repo.full_name)));
            let mut extra = BTreeMap::new();
            extra.insert("full_name".into(), json!(repo.full_name));
            extra.insert("description".into(), json!(description));
            extra.insert("topics".into(), json!(repo.topics));
            if let Some(l) = &repo.language {
                extra.insert("language".into(), json!(l));
            }
            if let Some(u) = repo.updated_at {
                extra.insert("updated_at".into(), json!(u.to_rfc3339()));
            }
            if !repo.readme.is_empty() {
                extra.insert("readme".into(), json!(repo.readme));
            }
            let title = repo.name.as_deref().unwrap_or(&repo.full_name).to_string();
            finish(Draft {
                source: SourceKind::CodeHost,
                origin: "github",
                title: &title,
                body: &body,
                url,
                created_at: repo.created_at,
                engagement: repo.stargazers_count,
                extra,
            })
        }
        RawRecord::Feed(entry) => {
            let mut extra = BTreeMap::new();
            extra.insert("feed".into(), json!(entry.feed));
            finish(Draft {
                source: SourceKind::SocialFeed,
                origin: "feed",
                title: entry.title.as_deref().unwrap_or_default(),
                body: entry.summary.as_deref().unwrap_or_default(),
                url: entry.link,
                created_at: entry.published,
                engagement: 0,
                extra,
            })
        }
    }
}

/// Outcome of normalizing one source's raw batch.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub items: Vec<ContentItem>,
    pub failures: usize,
}

/// Normalize a batch, dropping and counting records that cannot be normalized.
pub fn normalize_all(raw: Vec<RawRecord>) -> NormalizedBatch {
    let mut out = NormalizedBatch {
        items: Vec::with_capacity(raw.len()),
        failures: 0,
    };
    for rec in raw {
        match normalize(rec) {
            Ok(item) => out.items.push(item),
            Err(e) => {
                tracing::debug!(error = %e, "dropping record");
                out.failures += 1;
            }
        }
    }
    out
}

/// Drop items whose URL is already in `seen`, inserting the rest.
/// Returns (kept, dropped_count).
pub fn dedup_by_url(items: Vec<ContentItem>, seen: &mut HashSet<String>) -> (Vec<ContentItem>, usize) {
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if seen.insert(it.url.clone()) {
            kept.push(it);
        } else {
            dropped += 1;
        }
    }
    (kept, dropped)
}

/// Case-insensitive "any term appears in title or body" check used as the
/// keyword prefilter by Reddit and feed adapters. Empty terms keep everything.
pub fn matches_any_term(terms: &[String], title: &str, body: &str) -> bool {
    if terms.is_empty() {
        return true;
    }
    let title = title.to_lowercase();
    let body = body.to_lowercase();
    terms.iter().any(|t| {
        let t = t.trim().to_lowercase();
        !t.is_empty() && (title.contains(&t) || body.contains(&t))
    })
}
