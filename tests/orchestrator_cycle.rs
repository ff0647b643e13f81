// tests/orchestrator_cycle.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use ai_alpha_agent::ai_adapter::MockOracle;
use ai_alpha_agent::analyze::{KeywordSet, ScoredItem, Scorer};
use ai_alpha_agent::config::agent::SelectionConfig;
use ai_alpha_agent::config::{DocumentTemplates, RawFilterConfig};
use ai_alpha_agent::error::{ConfigError, ItemError, SourceError};
use ai_alpha_agent::ingest::types::{HnHit, RawRecord, SourceAdapter, SourceKind};
use ai_alpha_agent::notify::{Notifier, OutboundMessage};
use ai_alpha_agent::orchestrator::{SourceSlot, SourceStatus};
use ai_alpha_agent::prd::{Document, PrdGenerator, Synthesizer};
use ai_alpha_agent::process::{ItemProcessor, ItemState};
use ai_alpha_agent::Orchestrator;

struct StaticSource {
    name: String,
    records: Vec<RawRecord>,
    calls: AtomicUsize,
}

impl StaticSource {
    fn new(name: &str, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            records,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }
    async fn collect(&self, _terms: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

struct DownSource;

#[async_trait]
impl SourceAdapter for DownSource {
    fn name(&self) -> &str {
        "down"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::CodeHost
    }
    async fn collect(&self, _terms: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        Err(SourceError::unavailable("down", "connection refused"))
    }
}

/// Takes `delay` of (virtual) time to answer.
struct SlowSource {
    delay: Duration,
}

#[async_trait]
impl SourceAdapter for SlowSource {
    fn name(&self) -> &str {
        "slow"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }
    async fn collect(&self, _terms: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

struct FailSynthesisFor {
    url: String,
}

#[async_trait]
impl Synthesizer for FailSynthesisFor {
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

/// Rejects the first `reject_first` messages, then accepts.
struct Recording {
    sent: Mutex<Vec<OutboundMessage>>,
    reject_first: AtomicUsize,
}

impl Recording {
    fn new(reject_first: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject_first: AtomicUsize::new(reject_first),
        }
    }

    fn subjects(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.subject.clone()).collect()
    }
}

#[async_trait]
impl Notifier for Recording {
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<bool> {
        let rejected = self
            .reject_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Ok(false);
        }
        self.sent.lock().push(msg.clone());
        Ok(true)
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

fn hit(id: &str, title: &str, text: &str, points: i64) -> RawRecord {
    RawRecord::HackerNews(HnHit {
        object_id: id.into(),
        title: Some(title.into()),
        url: Some(format!("https://example.test/{id}")),
        story_text: Some(text.into()),
        points: Some(points),
        num_comments: Some(3),
        created_at_i: Some(Utc::now().timestamp()),
        author: Some("someone".into()),
    })
}

fn filter() -> RawFilterConfig {
    RawFilterConfig {
        max_age_days: Some(30),
        min_engagement: Some(10),
        min_content_length: Some(50),
        relevance_threshold: Some(0.3),
        max_items_per_source: Some(3),
        require_created_at: false,
    }
}

fn orchestrator(notifier: Arc<Recording>, selection: SelectionConfig) -> Orchestrator {
    let templates = DocumentTemplates::default();
    let processor = ItemProcessor::new(
        Arc::new(PrdGenerator::new(Arc::new(MockOracle::canned()), templates.clone())),
        notifier,
        "team@example.com",
        templates,
    );
    Orchestrator::new(
        Scorer::heuristic_only(KeywordSet::default()),
        processor,
        selection,
    )
}

const ORCH_BODY: &str =
    "A runtime where an autonomous agent delegates subtasks across a multi-agent team with shared memory.";

#[tokio::test]
async fn llm_orchestration_item_is_delivered_end_to_end() {
    let notifier = Arc::new(Recording::new(0));
    let mut orch = orchestrator(notifier.clone(), SelectionConfig::default()).with_source(
        SourceSlot::new(
            vec!["agent".into()],
            filter(),
            Box::new(StaticSource::new(
                "hn",
                vec![hit("1", "LLM Agent Orchestration Framework", ORCH_BODY, 150)],
            )),
        ),
    );

    let report = orch.run_cycle().await;

    let src = report.source("hn").expect("hn report");
    assert_eq!(src.status, SourceStatus::Ok);
    assert_eq!(src.selected, 1);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].state, ItemState::Delivered);
    assert_eq!(
        notifier.subjects(),
        vec!["AI Agent Opportunity Alert: LLM Agent Orchestration Framework".to_string()]
    );
}

#[tokio::test]
async fn missing_threshold_skips_only_that_source() {
    let notifier = Arc::new(Recording::new(0));
    let broken = RawFilterConfig {
        relevance_threshold: None,
        ..filter()
    };
    let mut orch = orchestrator(notifier.clone(), SelectionConfig::default())
        .with_source(SourceSlot::new(
            vec![],
            broken,
            Box::new(StaticSource::new("broken", vec![hit("9", "Agentic LLM", ORCH_BODY, 99)])),
        ))
        .with_source(SourceSlot::new(vec![], filter(), Box::new(DownSource)))
        .with_source(SourceSlot::new(
            vec![],
            filter(),
            Box::new(StaticSource::new(
                "hn",
                vec![hit("1", "LLM Agent Orchestration Framework", ORCH_BODY, 150)],
            )),
        ));

    let report = orch.run_cycle().await;

    assert_eq!(
        report.source("broken").unwrap().status,
        SourceStatus::Skipped(ConfigError::MissingField("relevance_threshold"))
    );
    assert!(matches!(
        report.source("down").unwrap().status,
        SourceStatus::Unavailable(_)
    ));
    assert_eq!(report.source("hn").unwrap().selected, 1);
    assert_eq!(report.delivered(), 1);
}

#[tokio::test]
async fn duplicate_urls_are_processed_once_per_cycle_and_across_cycles() {
    let notifier = Arc::new(Recording::new(0));
    let same = hit("1", "LLM Agent Orchestration Framework", ORCH_BODY, 150);
    let mut orch = orchestrator(notifier.clone(), SelectionConfig::default())
        .with_source(SourceSlot::new(
            vec![],
            filter(),
            Box::new(StaticSource::new("first", vec![same.clone()])),
        ))
        .with_source(SourceSlot::new(
            vec![],
            filter(),
            Box::new(StaticSource::new("second", vec![same])),
        ));

    let r1 = orch.run_cycle().await;
    assert_eq!(r1.source("first").unwrap().selected, 1);
    assert_eq!(r1.source("second").unwrap().duplicates, 1);
    assert_eq!(r1.delivered(), 1);

    let r2 = orch.run_cycle().await;
    assert_eq!(r2.source("first").unwrap().previously_delivered, 1);
    assert!(r2.outcomes.is_empty());
    assert_eq!(notifier.subjects().len(), 1);
    assert_eq!(orch.cycles_run(), 2);
}

#[tokio::test]
async fn failed_items_are_retried_next_cycle() {
    let notifier = Arc::new(Recording::new(1));
    let mut orch = orchestrator(notifier.clone(), SelectionConfig::default()).with_source(
        SourceSlot::new(
            vec![],
            filter(),
            Box::new(StaticSource::new(
                "hn",
                vec![hit("1", "LLM Agent Orchestration Framework", ORCH_BODY, 150)],
            )),
        ),
    );

    let r1 = orch.run_cycle().await;
    assert_eq!(r1.failed(), 1);
    assert!(orch.delivered_urls().is_empty());

    let r2 = orch.run_cycle().await;
    assert_eq!(r2.delivered(), 1);
    assert!(orch.delivered_urls().contains("https://example.test/1"));
}

#[tokio::test]
async fn selections_are_processed_in_source_then_rank_order_and_globally_capped() {
    let notifier = Arc::new(Recording::new(0));
    let selection = SelectionConfig {
        global_max_items: Some(3),
        dedup_across_cycles: true,
    };
    let mut orch = orchestrator(notifier.clone(), selection)
        .with_source(SourceSlot::new(
            vec![],
            filter(),
            Box::new(StaticSource::new(
                "a",
                vec![
                    hit("a-low", "Weekly notes", &format!("{ORCH_BODY} agentic"), 40),
                    hit("a-high", "Agentic LLM orchestration", ORCH_BODY, 20),
                ],
            )),
        ))
        .with_source(SourceSlot::new(
            vec![],
            filter(),
            Box::new(StaticSource::new(
                "b",
                vec![
                    hit("b-1", "Agentic LLM tooling", ORCH_BODY, 500),
                    hit("b-2", "LLM agent framework notes", ORCH_BODY, 400),
                ],
            )),
        ));

    let report = orch.run_cycle().await;
    assert_eq!(report.selected(), 4);
    let urls: Vec<&str> = report.outcomes.iter().map(|o| o.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.test/a-high",
            "https://example.test/a-low",
            "https://example.test/b-1",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn spawned_loop_runs_cycles_until_stopped() {
    let notifier = Arc::new(Recording::new(0));
    let orch = orchestrator(notifier, SelectionConfig::default()).with_source(SourceSlot::new(
        vec![],
        filter(),
        Box::new(StaticSource::new("hn", vec![])),
    ));

    let handle = orch.spawn(Duration::from_secs(60), true);
    tokio::time::sleep(Duration::from_secs(150)).await;
    let orch = handle.stop().await.expect("loop joins");
    assert!(orch.cycles_run() >= 2, "ran {} cycles", orch.cycles_run());
}

#[tokio::test(start_paused = true)]
async fn delayed_start_waits_for_first_interval() {
    let notifier = Arc::new(Recording::new(0));
    let orch = orchestrator(notifier, SelectionConfig::default());

    let handle = orch.spawn(Duration::from_secs(60), false);
    tokio::time::sleep(Duration::from_secs(30)).await;
    let orch = handle.stop().await.expect("loop joins");
    assert_eq!(orch.cycles_run(), 0);
}

#[tokio::test]
async fn item_rejected_by_one_source_can_still_be_selected_by_another() {
    let notifier = Arc::new(Recording::new(0));
    let same = hit("1", "LLM Agent Orchestration Framework", ORCH_BODY, 50);
    let strict = RawFilterConfig {
        min_engagement: Some(1000),
        ..filter()
    };
    let mut orch = orchestrator(notifier.clone(), SelectionConfig::default())
        .with_source(SourceSlot::new(
            vec![],
            strict,
            Box::new(StaticSource::new("strict", vec![same.clone()])),
        ))
        .with_source(SourceSlot::new(
            vec![],
            filter(),
            Box::new(StaticSource::new("lenient", vec![same])),
        ));

    let report = orch.run_cycle().await;

    assert_eq!(report.source("strict").unwrap().ineligible, 1);
    let lenient = report.source("lenient").unwrap();
    assert_eq!(lenient.duplicates, 0);
    assert_eq!(lenient.selected, 1);
    assert_eq!(report.delivered(), 1);
    assert_eq!(notifier.subjects().len(), 1);
}

#[tokio::test]
async fn cycle_summary_counts_one_failed_synthesis_among_five() {
    let notifier = Arc::new(Recording::new(0));
    let templates = DocumentTemplates::default();
    let processor = ItemProcessor::new(
        Arc::new(FailSynthesisFor {
            url: "https://example.test/3".into(),
        }),
        notifier.clone(),
        "team@example.com",
        templates,
    );
    let hits = (1..=5)
        .map(|i| hit(&i.to_string(), &format!("LLM Agent Orchestration Framework {i}"), ORCH_BODY, 150))
        .collect();
    let mut orch = Orchestrator::new(
        Scorer::heuristic_only(KeywordSet::default()),
        processor,
        SelectionConfig::default(),
    )
    .with_source(SourceSlot::new(
        vec![],
        RawFilterConfig {
            max_items_per_source: Some(5),
            ..filter()
        },
        Box::new(StaticSource::new("hn", hits)),
    ));

    let report = orch.run_cycle().await;

    assert_eq!(report.selected(), 5);
    assert_eq!(report.delivered(), 4);
    assert_eq!(report.failed(), 1);
    assert_eq!(notifier.subjects().len(), 4);
    assert!(!orch.delivered_urls().contains("https://example.test/3"));
}

#[tokio::test(start_paused = true)]
async fn stop_during_long_cycle_starts_no_further_cycle() {
    let notifier = Arc::new(Recording::new(0));
    let orch = orchestrator(notifier, SelectionConfig::default()).with_source(SourceSlot::new(
        vec![],
        filter(),
        Box::new(SlowSource {
            delay: Duration::from_secs(100),
        }),
    ));

    let handle = orch.spawn(Duration::from_secs(10), true);
    tokio::time::sleep(Duration::from_secs(50)).await;
    let orch = handle.stop().await.expect("loop joins");
    assert_eq!(orch.cycles_run(), 1);
}
