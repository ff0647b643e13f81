use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use super::{Notifier, OutboundMessage};

const ATTACHMENT_PREVIEW_CHARS: usize = 2500;

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SLACK_WEBHOOK_URL").context("SLACK_WEBHOOK_URL missing")?;
        Self::new(url)
    }

    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("slack client")?;
        Ok(Self {
            webhook_url: url.into(),
            client,
        })
    }
}

/// Slack has no file upload on incoming webhooks, so the PRD goes inline as
/// a truncated code block.
pub fn render_text(msg: &OutboundMessage) -> String {
    let mut text = format!("*{}*\n{}", msg.subject, msg.body);
    if let Some(att) = &msg.attachment {
        let preview: String = att.content.chars().take(ATTACHMENT_PREVIEW_CHARS).collect();
        text.push_str(&format!("\n\n`{}`\n```{}```", att.filename, preview));
    }
    text
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, msg: &OutboundMessage) -> Result<bool> {
        let body = serde_json::json!({ "text": render_text(msg) });
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("slack post")?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, "slack rejected message");
        }
        Ok(status.is_success())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
