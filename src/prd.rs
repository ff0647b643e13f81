// src/prd.rs
//! PRD synthesis: one oracle call per template section, then the sections
//! are rendered into the document template.

use async_trait::async_trait;
use chrono::Utc;

use crate::analyze::ai_adapter::{CompletionRequest, DynOracle};
use crate::analyze::ScoredItem;
use crate::config::templates::{render_template, DocumentTemplates};
use crate::error::ItemError;
use crate::ingest::types::ContentItem;

const README_PROMPT_CHARS: usize = 4000;

const SECTION_SYSTEM: &str = "You are a product manager writing concise, professional and actionable \
product requirements documents for AI agent products. Write Markdown without a heading.";

/// Opaque synthesized document handed to delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub markdown: String,
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, item: &ScoredItem) -> Result<Document, ItemError>;
}

/// Display name of the item's platform.
pub fn platform_label(item: &ContentItem) -> &str {
    match item.origin.as_str() {
        "hackernews" => "HackerNews",
        "reddit" => "Reddit",
        "github" => "GitHub",
        "feed" => "Social feed",
        other => other,
    }
}

pub fn section_prompt(item: &ContentItem, section: &str) -> CompletionRequest {
    let readme: String = item.extra_str("readme").chars().take(README_PROMPT_CHARS).collect();
    let text = if readme.is_empty() {
        item.body.clone()
    } else {
        let description = item.extra_str("description");
        format!("Description: {description}\n\nREADME:\n{readme}")
    };
    let prompt = format!(
        "Based on the following content about an AI agent idea, generate the {section} section for a PRD.
Make it detailed, professional, and actionable.

Content:
Title: {title}
Platform: {platform}
Text: {text}
URL: {url}

Generate the {section} section:",
        title = item.title,
        platform = platform_label(item),
        url = item.url,
    );
    CompletionRequest {
        system: SECTION_SYSTEM.to_string(),
        prompt,
        max_tokens: 700,
        temperature: 0.4,
    }
}

pub struct PrdGenerator {
    oracle: DynOracle,
    templates: DocumentTemplates,
}

impl PrdGenerator {
    pub fn new(oracle: DynOracle, templates: DocumentTemplates) -> Self {
        Self { oracle, templates }
    }

    async fn section(&self, item: &ContentItem, name: &str) -> Result<String, ItemError> {
        let req = section_prompt(item, name);
        let text = self
            .oracle
            .complete(&req)
            .await
            .map_err(|e| ItemError::Synthesis {
                section: name.to_string(),
                reason: e.to_string(),
            })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ItemError::Synthesis {
                section: name.to_string(),
                reason: "empty section".into(),
            });
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Synthesizer for PrdGenerator {
    async fn synthesize(&self, scored: &ScoredItem) -> Result<Document, ItemError> {
        let item = scored.item();
        let title = if item.title.is_empty() {
            "Untitled AI Agent Concept".to_string()
        } else {
            item.title.clone()
        };

        let mut sections = Vec::with_capacity(self.templates.sections.len());
        for spec in &self.templates.sections {
            let text = self.section(item, &spec.name).await?;
            sections.push((spec.key.clone(), text));
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let mut vars: Vec<(&str, &str)> = vec![
            ("title", title.as_str()),
            ("source_url", item.url.as_str()),
            ("platform", platform_label(item)),
            ("date", date.as_str()),
        ];
        vars.extend(sections.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let markdown = render_template(&self.templates.prd_template, vars);

        Ok(Document { title, markdown })
    }
}
