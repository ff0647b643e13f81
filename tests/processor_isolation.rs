// tests/processor_isolation.rs
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use ai_alpha_agent::ai_adapter::MockOracle;
use ai_alpha_agent::analyze::{KeywordSet, ScoredItem, Scorer};
use ai_alpha_agent::config::DocumentTemplates;
use ai_alpha_agent::error::ItemError;
use ai_alpha_agent::ingest::types::{ContentItem, SourceKind};
use ai_alpha_agent::notify::{Notifier, OutboundMessage, ATTACHMENT_NAME};
use ai_alpha_agent::prd::{Document, PrdGenerator, Synthesizer};
use ai_alpha_agent::process::{ItemProcessor, ItemState, Stage};

struct FailOn {
    url: String,
}

#[async_trait]
impl Synthesizer for FailOn {
    async fn synthesize(&self, item: &ScoredItem) -> Result<Document, ItemError> {
        if item.item().url == self.url {
            return Err(ItemError::Synthesis {
                section: "Overview".into(),
                reason: "oracle unavailable".into(),
            });
        }
        Ok(Document {
            title: item.item().title.clone(),
            markdown: format!("# {}", item.item().title),
        })
    }
}

#[derive(Default)]
struct Recording {
    sent: Mutex<Vec<OutboundMessage>>,
    accept: bool,
}

impl Recording {
    fn accepting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            accept: true,
        }
    }
}

#[async_trait]
impl Notifier for Recording {
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<bool> {
        self.sent.lock().push(msg.clone());
        Ok(self.accept)
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

async fn items(n: usize) -> Vec<ScoredItem> {
    let scorer = Scorer::heuristic_only(KeywordSet::default());
    let mut out = Vec::new();
    for i in 1..=n {
        let it = ContentItem {
            source: SourceKind::Forum,
            origin: "hackernews".into(),
            title: format!("Agentic tool {i}"),
            body: "an llm powered assistant".into(),
            url: format!("https://t.test/{i}"),
            created_at: None,
            engagement: 10,
            extra: Default::default(),
        };
        out.push(scorer.score(it).await);
    }
    out
}

#[tokio::test]
async fn one_failed_synthesis_does_not_affect_other_items() {
    let notifier = Arc::new(Recording::accepting());
    let processor = ItemProcessor::new(
        Arc::new(FailOn {
            url: "https://t.test/3".into(),
        }),
        notifier.clone(),
        "team@example.com",
        DocumentTemplates::default(),
    );

    let outcomes = processor.process_batch(&items(5).await).await;

    assert_eq!(outcomes.len(), 5);
    assert_eq!(outcomes.iter().filter(|o| o.delivered()).count(), 4);
    assert!(matches!(
        outcomes[2].state,
        ItemState::Failed {
            stage: Stage::Synthesizing,
            error: ItemError::Synthesis { .. }
        }
    ));

    let sent = notifier.sent.lock();
    let subjects: Vec<&str> = sent.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(
        subjects,
        vec![
            "AI Agent Opportunity Alert: Agentic tool 1",
            "AI Agent Opportunity Alert: Agentic tool 2",
            "AI Agent Opportunity Alert: Agentic tool 4",
            "AI Agent Opportunity Alert: Agentic tool 5",
        ],
        "failed item must not reach delivery and order is preserved"
    );
}

#[tokio::test]
async fn rejected_delivery_fails_at_sending() {
    let processor = ItemProcessor::new(
        Arc::new(FailOn { url: String::new() }),
        Arc::new(Recording::default()),
        "team@example.com",
        DocumentTemplates::default(),
    );
    let batch = items(2).await;
    let outcomes = processor.process_batch(&batch).await;
    assert!(outcomes.iter().all(|o| matches!(
        o.state,
        ItemState::Failed {
            stage: Stage::Sending,
            error: ItemError::Delivery(_)
        }
    )));
}

#[tokio::test]
async fn prd_generator_fills_every_section_and_attaches_document() {
    let oracle = MockOracle::canned();
    let templates = DocumentTemplates::default();
    let notifier = Arc::new(Recording::accepting());
    let processor = ItemProcessor::new(
        Arc::new(PrdGenerator::new(Arc::new(oracle.clone()), templates.clone())),
        notifier.clone(),
        "team@example.com",
        templates.clone(),
    );

    let batch = items(1).await;
    let outcome = processor.process_item(&batch[0]).await;
    assert_eq!(outcome.state, ItemState::Delivered);
    assert_eq!(oracle.calls(), templates.sections.len());

    let sent = notifier.sent.lock();
    let att = sent[0].attachment.as_ref().expect("prd attached");
    assert_eq!(att.filename, ATTACHMENT_NAME);
    assert!(att.content.starts_with("# Product Requirements Document: Agentic tool 1"));
    assert!(att.content.contains("## Success Metrics\nMock section text."));
    assert!(!att.content.contains("{overview}"));
}

#[tokio::test]
async fn empty_section_is_a_synthesis_failure_without_delivery() {
    let notifier = Arc::new(Recording::accepting());
    let processor = ItemProcessor::new(
        Arc::new(PrdGenerator::new(
            Arc::new(MockOracle::fixed("   ")),
            DocumentTemplates::default(),
        )),
        notifier.clone(),
        "team@example.com",
        DocumentTemplates::default(),
    );

    let batch = items(1).await;
    let outcome = processor.process_item(&batch[0]).await;
    match outcome.state {
        ItemState::Failed {
            stage: Stage::Synthesizing,
            error: ItemError::Synthesis { section, .. },
        } => assert_eq!(section, "Overview"),
        other => panic!("unexpected state {other:?}"),
    }
    assert!(notifier.sent.lock().is_empty());
}
