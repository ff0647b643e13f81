// src/config/templates.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};

const ENV_PATH: &str = "TEMPLATES_PATH";
pub const DEFAULT_TEMPLATES_PATH: &str = "config/templates.toml";

const DEFAULT_PRD_TEMPLATE: &str = "# Product Requirements Document: {title}

_Source: {platform} · {source_url} · generated {date}_

## Overview
{overview}

## Problem Statement
{problem_statement}

## Proposed Solution
{solution}

## Key Features
{features}

## Technical Requirements
{technical_requirements}

## Market Analysis
{market_analysis}

## Implementation Timeline
{timeline}

## Resources Required
{resources}

## Success Metrics
{metrics}
";

const DEFAULT_EMAIL_TEMPLATE: &str = "Hi {recipient},

A new AI agent opportunity was spotted on {platform}.

{title}
Relevance: {relevance_score}/10

Summary:
{summary}

Key points:
{key_points}

The full PRD is attached (opportunity_prd.md).
";

/// One document section the oracle drafts: `key` is the template
/// placeholder, `name` goes into the prompt.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SectionSpec {
    pub key: String,
    pub name: String,
}

fn default_sections() -> Vec<SectionSpec> {
    [
        ("overview", "Overview"),
        ("problem_statement", "Problem Statement"),
        ("solution", "Proposed Solution"),
        ("features", "Key Features"),
        ("technical_requirements", "Technical Requirements"),
        ("market_analysis", "Market Analysis"),
        ("timeline", "Implementation Timeline"),
        ("resources", "Resources Required"),
        ("metrics", "Success Metrics"),
    ]
    .into_iter()
    .map(|(key, name)| SectionSpec {
        key: key.to_string(),
        name: name.to_string(),
    })
    .collect()
}

fn default_prd_template() -> String {
    DEFAULT_PRD_TEMPLATE.to_string()
}

fn default_email_template() -> String {
    DEFAULT_EMAIL_TEMPLATE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentTemplates {
    #[serde(default = "default_prd_template")]
    pub prd_template: String,
    #[serde(default = "default_email_template")]
    pub email_template: String,
    #[serde(default = "default_sections")]
    pub sections: Vec<SectionSpec>,
}

impl Default for DocumentTemplates {
    fn default() -> Self {
        Self {
            prd_template: default_prd_template(),
            email_template: default_email_template(),
            sections: default_sections(),
        }
    }
}

impl DocumentTemplates {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading templates from {}", path.display()))?;
        toml::from_str(&s).context("parsing templates toml")
    }

    /// `$TEMPLATES_PATH`, then `config/templates.toml`, then built-in defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_PATH) {
            return Self::load_from(Path::new(&p));
        }
        let p = Path::new(DEFAULT_TEMPLATES_PATH);
        if p.exists() {
            return Self::load_from(p);
        }
        Ok(Self::default())
    }
}

/// Replace `{key}` placeholders; unknown placeholders are left as-is.
pub fn render_template<'a, I>(template: &str, vars: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = template.to_string();
    for (k, v) in vars {
        out = out.replace(&format!("{{{k}}}"), v);
    }
    out
}
