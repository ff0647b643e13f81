// src/notify/mod.rs
//! Delivery of synthesized opportunities: message composition plus the
//! email / Slack / outbox channels.

pub mod email;
pub mod outbox;
pub mod slack;

use std::sync::Arc;

use anyhow::Result;

use crate::analyze::ScoredItem;
use crate::config::agent::{DeliveryChannel, DeliveryConfig};
use crate::config::templates::{render_template, DocumentTemplates};
use crate::ingest::types::ContentItem;
use crate::prd::{platform_label, Document};

pub use email::EmailSender;
pub use outbox::OutboxNotifier;
pub use slack::SlackNotifier;

pub const ATTACHMENT_NAME: &str = "opportunity_prd.md";
const SUMMARY_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Stable id of the item the message is about; empty when not tied to one.
    pub item_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// A delivery channel. `Ok(false)` means the channel answered but did not
/// accept the message.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &OutboundMessage) -> Result<bool>;
    fn name(&self) -> &'static str;
}

fn summary(item: &ContentItem) -> String {
    let text = match item.extra_str("description") {
        "" => item.body.as_str(),
        d => d,
    };
    let mut out: String = text.chars().take(SUMMARY_CHARS).collect();
    if text.chars().count() > SUMMARY_CHARS {
        out.push_str("...");
    }
    out
}

/// Bullet list of the facts worth a glance in the email body.
pub fn key_points(item: &ContentItem) -> Vec<String> {
    let label = match item.origin.as_str() {
        "github" => "Stars",
        "reddit" => "Score",
        _ => "Points",
    };
    let mut out = vec![format!("{label}: {}", item.engagement)];
    if let Some(ts) = item.created_at {
        out.push(format!("Posted: {}", ts.format("%Y-%m-%d")));
    }
    let language = item.extra_str("language");
    if !language.is_empty() {
        out.push(format!("Language: {language}"));
    }
    if let Some(topics) = item.extra.get("topics").and_then(|v| v.as_array()) {
        let topics: Vec<&str> = topics.iter().filter_map(|t| t.as_str()).collect();
        if !topics.is_empty() {
            out.push(format!("Topics: {}", topics.join(", ")));
        }
    }
    let updated = item.extra_str("updated_at");
    if !updated.is_empty() {
        out.push(format!("Last updated: {updated}"));
    }
    out
}

pub fn compose_message(
    scored: &ScoredItem,
    doc: &Document,
    recipient: &str,
    templates: &DocumentTemplates,
) -> OutboundMessage {
    let item = scored.item();
    let score = format!("{}", (scored.relevance_score() * 10.0) as i32);
    let summary = summary(item);
    let points = key_points(item)
        .into_iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    let body = render_template(
        &templates.email_template,
        [
            ("recipient", recipient),
            ("platform", platform_label(item)),
            ("title", doc.title.as_str()),
            ("relevance_score", score.as_str()),
            ("summary", summary.as_str()),
            ("key_points", points.as_str()),
        ],
    );

    OutboundMessage {
        item_id: item.short_id(),
        recipient: recipient.to_string(),
        subject: format!("AI Agent Opportunity Alert: {}", doc.title),
        body,
        attachment: Some(Attachment {
            filename: ATTACHMENT_NAME.to_string(),
            content: doc.markdown.clone(),
        }),
    }
}

pub fn build_notifier(config: &DeliveryConfig) -> Result<Arc<dyn Notifier>> {
    let n: Arc<dyn Notifier> = match config.channel {
        DeliveryChannel::Email => Arc::new(EmailSender::from_env()?),
        DeliveryChannel::Slack => Arc::new(SlackNotifier::from_env()?),
        DeliveryChannel::Outbox => Arc::new(OutboxNotifier::new(config.outbox_dir.clone())),
    };
    tracing::info!(channel = n.name(), "delivery channel ready");
    Ok(n)
}
