// src/ingest/providers/github.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::providers::{collect_units, http_client, parse_each};
use crate::ingest::types::{GitHubRepo, RawRecord, SourceAdapter, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

pub fn parse_search_response(body: &str) -> Result<Vec<RawRecord>> {
    let resp: SearchResponse =
        serde_json::from_str(body).context("parsing github search json")?;
    let out = parse_each(resp.items, "github", RawRecord::GitHub);
    counter!("curator_raw_items_parsed_total", "source" => "github").increment(out.len() as u64);
    Ok(out)
}

/// Repository search on GitHub, optionally enriched with README text.
pub struct GitHubAdapter {
    name: String,
    base_url: String,
    per_page: u32,
    min_stars: u64,
    fetch_readme: bool,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubAdapter {
    pub fn new(name: impl Into<String>, min_stars: u64) -> Self {
        Self {
            name: name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: 10,
            min_stars,
            fetch_readme: true,
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_per_page(mut self, n: u32) -> Self {
        self.per_page = n.clamp(1, 100);
        self
    }

    pub fn with_readme(mut self, on: bool) -> Self {
        self.fetch_readme = on;
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .get(url)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    async fn search(&self, term: String) -> Result<Vec<RawRecord>> {
        let url = format!("{}/search/repositories", self.base_url.trim_end_matches('/'));
        let per_page = self.per_page.to_string();
        let body = self
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", term.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await
            .context("github search get()")?
            .error_for_status()
            .context("github search non-2xx")?
            .text()
            .await
            .context("github search .text()")?;

        let mut records = parse_search_response(&body)?;
        if self.fetch_readme {
            for rec in records.iter_mut() {
                if let RawRecord::GitHub(repo) = rec {
                    repo.readme = self.readme(&repo.full_name).await;
                }
            }
        }
        Ok(records)
    }

    /// README as raw text; empty on any failure, which the eligibility filter
    /// later treats as "no README".
    async fn readme(&self, full_name: &str) -> String {
        let url = format!("{}/repos/{}/readme", self.base_url.trim_end_matches('/'), full_name);
        let resp = self
            .get(&url)
            .header("Accept", "application/vnd.github.raw")
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match resp {
            Ok(r) => r.text().await.unwrap_or_default(),
            Err(e) => {
                tracing::debug!(error = %e, repo = full_name, "readme fetch failed");
                String::new()
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for GitHubAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CodeHost
    }

    async fn collect(&self, query_terms: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        collect_units(&self.name, query_terms, |term| self.search(term)).await
    }

    fn eligibility_filter(&self, raw: Vec<RawRecord>) -> Vec<RawRecord> {
        raw.into_iter()
            .filter(|r| match r {
                RawRecord::GitHub(GitHubRepo {
                    stargazers_count,
                    description,
                    readme,
                    ..
                }) => {
                    let has_description = description
                        .as_deref()
                        .is_some_and(|d| !d.trim().is_empty());
                    let has_readme = !self.fetch_readme || !readme.trim().is_empty();
                    *stargazers_count >= self.min_stars && has_description && has_readme
                }
                _ => true,
            })
            .collect()
    }
}
