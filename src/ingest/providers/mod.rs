// src/ingest/providers/mod.rs
pub mod feed;
pub mod github;
pub mod hackernews;
pub mod reddit;

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use metrics::{counter, histogram};

use crate::config::{SourceSettings, SourceSpec};
use crate::error::SourceError;
use crate::ingest::types::{RawRecord, SourceAdapter};

const USER_AGENT: &str = "ai-alpha-agent/0.1 (content curation bot)";

/// Shared HTTP client settings for all source adapters.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default reqwest client");
            reqwest::Client::new()
        })
}

/// Run `fetch` for every unit (query term, subreddit, feed url), skipping
/// failed units. Only when every unit failed is the source reported
/// unavailable. Records are deduplicated by locator across units.
pub(crate) async fn collect_units<F, Fut>(
    source: &str,
    units: &[String],
    mut fetch: F,
) -> Result<Vec<RawRecord>, SourceError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<RawRecord>>>,
{
    let t0 = std::time::Instant::now();
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut failures = 0usize;
    let mut last_err = None;

    for unit in units {
        match fetch(unit.clone()).await {
            Ok(records) => {
                for rec in records {
                    if let Some(key) = rec.locator() {
                        if !seen.insert(key) {
                            continue;
                        }
                    }
                    out.push(rec);
                }
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), source = source, unit = %unit, "source query failed");
                counter!("curator_source_query_errors_total").increment(1);
                failures += 1;
                last_err = Some(e);
            }
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("curator_collect_ms").record(ms);

    if !units.is_empty() && failures == units.len() {
        let reason = last_err
            .map(|e| format!("{e:#}"))
            .unwrap_or_else(|| "all queries failed".to_string());
        return Err(SourceError::unavailable(source, reason));
    }
    Ok(out)
}

/// Deserialize each element independently so one malformed record only
/// drops itself.
pub(crate) fn parse_each<T, F>(values: Vec<serde_json::Value>, source: &str, wrap: F) -> Vec<RawRecord>
where
    T: serde::de::DeserializeOwned,
    F: Fn(T) -> RawRecord,
{
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match serde_json::from_value::<T>(v) {
            Ok(rec) => out.push(wrap(rec)),
            Err(e) => {
                tracing::debug!(error = %e, source = source, "skipping malformed record");
                counter!("curator_malformed_records_total").increment(1);
            }
        }
    }
    out
}

/// Build the adapter a configured source entry describes.
pub fn build_adapter(spec: &SourceSpec) -> Box<dyn SourceAdapter> {
    let name = spec.name.clone();
    match &spec.settings {
        SourceSettings::HackerNews {
            min_points,
            hits_per_query,
            base_url,
        } => {
            let mut a = hackernews::HackerNewsAdapter::new(name, *min_points);
            if let Some(n) = hits_per_query {
                a = a.with_hits_per_query(*n);
            }
            if let Some(u) = base_url {
                a = a.with_base_url(u.clone());
            }
            Box::new(a)
        }
        SourceSettings::Reddit {
            subreddits,
            min_score,
            limit,
            base_url,
        } => {
            let mut a = reddit::RedditAdapter::new(name, subreddits.clone(), *min_score);
            if let Some(n) = limit {
                a = a.with_limit(*n);
            }
            if let Some(u) = base_url {
                a = a.with_base_url(u.clone());
            }
            Box::new(a)
        }
        SourceSettings::GitHub {
            min_stars,
            per_page,
            fetch_readme,
            base_url,
        } => {
            let mut a = github::GitHubAdapter::new(name, *min_stars).with_readme(*fetch_readme);
            if let Some(n) = per_page {
                a = a.with_per_page(*n);
            }
            if let Some(u) = base_url {
                a = a.with_base_url(u.clone());
            }
            Box::new(a)
        }
        SourceSettings::Feed { urls } => Box::new(feed::FeedAdapter::from_urls(name, urls.clone())),
    }
}
