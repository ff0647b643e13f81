use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{Notifier, OutboundMessage};

const SLUG_MAX: usize = 80;

/// Dry-run channel: every message becomes `<stem>.txt` (headers + body)
/// and, with an attachment, `<stem>.md` in the outbox directory.
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out: String = out.trim_matches('-').chars().take(SLUG_MAX).collect();
    let out = out.trim_end_matches('-');
    if out.is_empty() {
        "message".to_string()
    } else {
        out.to_string()
    }
}

/// `<slug>-<item id>`, so items sharing a title get their own files.
fn file_stem(msg: &OutboundMessage) -> String {
    let title = slug(msg.subject.trim_start_matches("AI Agent Opportunity Alert:"));
    if msg.item_id.is_empty() {
        title
    } else {
        format!("{title}-{}", msg.item_id)
    }
}

#[async_trait::async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, msg: &OutboundMessage) -> Result<bool> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating outbox {}", self.dir.display()))?;

        let stem = file_stem(msg);
        let envelope = format!(
            "To: {}\nSubject: {}\n\n{}",
            msg.recipient, msg.subject, msg.body
        );
        let txt = self.dir.join(format!("{stem}.txt"));
        tokio::fs::write(&txt, envelope)
            .await
            .with_context(|| format!("writing {}", txt.display()))?;

        if let Some(att) = &msg.attachment {
            let md = self.dir.join(format!("{stem}.md"));
            tokio::fs::write(&md, &att.content)
                .await
                .with_context(|| format!("writing {}", md.display()))?;
        }
        tracing::info!(path = %txt.display(), "message written to outbox");
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "outbox"
    }
}
