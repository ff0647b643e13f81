// src/ingest/providers/feed.rs
//! RSS 2.0 / Atom social feeds (Mastodon tag feeds, Bluesky and Nitter RSS,
//! newsletters). Entries are prefiltered by the query terms.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::error::SourceError;
use crate::ingest::matches_any_term;
use crate::ingest::providers::{collect_units, http_client};
use crate::ingest::types::{FeedEntry, RawRecord, SourceAdapter, SourceKind};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(default)]
    link: Vec<AtomLink>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Parse an RSS or Atom document into feed entries matching `terms`.
pub fn parse_feed(xml: &str, feed: &str, terms: &[String]) -> Result<Vec<RawRecord>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let entries: Vec<FeedEntry> = if xml_clean.contains("<rss") {
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        rss.channel
            .item
            .into_iter()
            .map(|it| FeedEntry {
                feed: feed.to_string(),
                title: it.title,
                link: it.link,
                summary: it.description,
                published: it.pub_date.as_deref().and_then(parse_rfc2822),
            })
            .collect()
    } else {
        let atom: Atom = from_str(&xml_clean).context("parsing atom xml")?;
        atom.entry
            .into_iter()
            .map(|e| {
                let link = e
                    .link
                    .iter()
                    .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                    .or(e.link.first())
                    .and_then(|l| l.href.clone());
                FeedEntry {
                    feed: feed.to_string(),
                    title: e.title.map(|t| t.value),
                    link,
                    summary: e.summary.or(e.content).map(|t| t.value),
                    published: e
                        .published
                        .or(e.updated)
                        .as_deref()
                        .and_then(parse_rfc3339),
                }
            })
            .collect()
    };

    let out: Vec<RawRecord> = entries
        .into_iter()
        .filter(|e| {
            matches_any_term(
                terms,
                e.title.as_deref().unwrap_or_default(),
                e.summary.as_deref().unwrap_or_default(),
            )
        })
        .map(RawRecord::Feed)
        .collect();
    counter!("curator_raw_items_parsed_total", "source" => "feed").increment(out.len() as u64);
    Ok(out)
}

enum Mode {
    // Own copy so tests don't need 'static fixtures.
    Fixture(String),
    Http {
        urls: Vec<String>,
        client: reqwest::Client,
    },
}

pub struct FeedAdapter {
    name: String,
    mode: Mode,
}

impl FeedAdapter {
    pub fn from_urls(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Http {
                urls,
                client: http_client(),
            },
        }
    }

    pub fn from_fixture(name: impl Into<String>, xml: &str) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SocialFeed
    }

    async fn collect(&self, query_terms: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        match &self.mode {
            Mode::Fixture(xml) => parse_feed(xml, &self.name, query_terms)
                .map_err(|e| SourceError::unavailable(&self.name, format!("{e:#}"))),
            Mode::Http { urls, client } => {
                collect_units(&self.name, urls, |url| async move {
                    let body = client
                        .get(&url)
                        .send()
                        .await
                        .with_context(|| format!("feed get {url}"))?
                        .error_for_status()
                        .context("feed non-2xx")?
                        .text()
                        .await
                        .context("feed http .text()")?;
                    parse_feed(&body, &url, query_terms)
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>tag: agents</title>
  <entry>
    <title type="html">Shipping a multi-agent planner</title>
    <link rel="alternate" href="https://social.test/@a/1"/>
    <summary>We open sourced our agentic planner&hellip;</summary>
    <updated>2025-03-01T10:00:00Z</updated>
  </entry>
  <entry>
    <title>Weekend hike photos</title>
    <link href="https://social.test/@a/2"/>
  </entry>
</feed>"#;

    #[test]
    fn atom_entries_parse_and_prefilter() {
        let recs = parse_feed(ATOM, "mastodon", &["agent".to_string()]).unwrap();
        assert_eq!(recs.len(), 1);
        match &recs[0] {
            RawRecord::Feed(e) => {
                assert_eq!(e.link.as_deref(), Some("https://social.test/@a/1"));
                assert!(e.published.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rfc2822_dates_parse() {
        assert!(parse_rfc2822("Tue, 10 Jun 2025 14:00:00 +0000").is_some());
        assert!(parse_rfc2822("yesterday").is_none());
    }
}
