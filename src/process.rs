// src/process.rs
//! Per-item lifecycle: Selected → Synthesizing → Sending → Delivered, or
//! Failed at the stage that broke. Items are isolated from each other.

use std::sync::Arc;

use crate::analyze::ScoredItem;
use crate::config::DocumentTemplates;
use crate::error::ItemError;
use crate::notify::{compose_message, Notifier};
use crate::prd::Synthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesizing,
    Sending,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Synthesizing => "synthesizing",
            Stage::Sending => "sending",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemState {
    Selected,
    Synthesizing,
    Sending,
    Delivered,
    Failed { stage: Stage, error: ItemError },
}

#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub url: String,
    pub title: String,
    pub state: ItemState,
}

impl ItemOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self.state, ItemState::Delivered)
    }
}

pub struct ItemProcessor {
    synthesizer: Arc<dyn Synthesizer>,
    notifier: Arc<dyn Notifier>,
    recipient: String,
    templates: DocumentTemplates,
}

impl ItemProcessor {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        notifier: Arc<dyn Notifier>,
        recipient: impl Into<String>,
        templates: DocumentTemplates,
    ) -> Self {
        Self {
            synthesizer,
            notifier,
            recipient: recipient.into(),
            templates,
        }
    }

    pub fn set_recipient(&mut self, recipient: impl Into<String>) {
        self.recipient = recipient.into();
    }

    async fn run(&self, scored: &ScoredItem) -> Result<(), (Stage, ItemError)> {
        let item = scored.item();
        let id = item.short_id();

        tracing::debug!(%id, url = %item.url, state = ?ItemState::Synthesizing, "item transition");
        let doc = self
            .synthesizer
            .synthesize(scored)
            .await
            .map_err(|e| (Stage::Synthesizing, e))?;

        tracing::debug!(%id, url = %item.url, state = ?ItemState::Sending, "item transition");
        let msg = compose_message(scored, &doc, &self.recipient, &self.templates);
        match self.notifier.send(&msg).await {
            Ok(true) => Ok(()),
            Ok(false) => Err((
                Stage::Sending,
                ItemError::Delivery(format!("{} did not accept the message", self.notifier.name())),
            )),
            Err(e) => Err((Stage::Sending, ItemError::Delivery(format!("{e:#}")))),
        }
    }

    /// Drive one item to a terminal state. Never panics and never returns an
    /// error: failures are captured in the outcome.
    pub async fn process_item(&self, scored: &ScoredItem) -> ItemOutcome {
        let item = scored.item();
        let id = item.short_id();
        tracing::debug!(%id, url = %item.url, state = ?ItemState::Selected, score = scored.relevance_score(), "item transition");

        let state = match self.run(scored).await {
            Ok(()) => {
                tracing::info!(%id, url = %item.url, score = scored.relevance_score(), "delivered");
                ItemState::Delivered
            }
            Err((stage, error)) => {
                tracing::warn!(%id, url = %item.url, stage = stage.as_str(), %error, "item failed");
                ItemState::Failed { stage, error }
            }
        };
        ItemOutcome {
            url: item.url.clone(),
            title: item.title.clone(),
            state,
        }
    }

    /// Sequential, in order.
    pub async fn process_batch(&self, items: &[ScoredItem]) -> Vec<ItemOutcome> {
        let mut out = Vec::with_capacity(items.len());
        for it in items {
            out.push(self.process_item(it).await);
        }
        out
    }
}
