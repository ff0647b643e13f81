// src/orchestrator.rs
//! Batch orchestrator: one cycle runs every configured source through
//! collect → normalize → dedup → select, then processes the combined
//! selection in order. `spawn` drives cycles on an interval until stopped.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::analyze::{select, ScoredItem, Scorer};
use crate::config::agent::SelectionConfig;
use crate::config::{AgentConfig, FilterConfig, RawFilterConfig, SourceSpec};
use crate::error::ConfigError;
use crate::ingest::providers::build_adapter;
use crate::ingest::types::SourceAdapter;
use crate::ingest::{dedup_by_url, normalize_all};
use crate::process::{ItemOutcome, ItemProcessor};

/// One configured source: adapter plus its reloadable settings.
pub struct SourceSlot {
    pub name: String,
    pub queries: Vec<String>,
    pub filter: RawFilterConfig,
    pub adapter: Box<dyn SourceAdapter>,
}

impl SourceSlot {
    pub fn new(
        queries: Vec<String>,
        filter: RawFilterConfig,
        adapter: Box<dyn SourceAdapter>,
    ) -> Self {
        Self {
            name: adapter.name().to_string(),
            queries,
            filter,
            adapter,
        }
    }

    pub fn from_spec(spec: &SourceSpec) -> Self {
        Self {
            name: spec.name.clone(),
            queries: spec.queries.clone(),
            filter: spec.filter.clone(),
            adapter: build_adapter(spec),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Ok,
    Skipped(ConfigError),
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub name: String,
    pub status: SourceStatus,
    pub raw_found: usize,
    /// Dropped by the adapter's own eligibility filter.
    pub source_filtered: usize,
    pub normalized: usize,
    pub normalize_failures: usize,
    pub duplicates: usize,
    pub previously_delivered: usize,
    pub ineligible: usize,
    pub below_threshold: usize,
    pub selected: usize,
}

impl SourceReport {
    fn new(name: &str, status: SourceStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            raw_found: 0,
            source_filtered: 0,
            normalized: 0,
            normalize_failures: 0,
            duplicates: 0,
            previously_delivered: 0,
            ineligible: 0,
            below_threshold: 0,
            selected: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub outcomes: Vec<ItemOutcome>,
}

impl CycleReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }

    pub fn selected(&self) -> usize {
        self.sources.iter().map(|s| s.selected).sum()
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.name == name)
    }
}

pub struct Orchestrator {
    sources: Vec<SourceSlot>,
    scorer: Scorer,
    processor: ItemProcessor,
    selection: SelectionConfig,
    delivered_urls: HashSet<String>,
    cycles: u64,
    config_path: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(scorer: Scorer, processor: ItemProcessor, selection: SelectionConfig) -> Self {
        Self {
            sources: Vec::new(),
            scorer,
            processor,
            selection,
            delivered_urls: HashSet::new(),
            cycles: 0,
            config_path: None,
        }
    }

    /// Build from loaded configuration, one adapter per `[[sources]]` entry.
    pub fn from_config(config: &AgentConfig, scorer: Scorer, processor: ItemProcessor) -> Self {
        let mut o = Self::new(scorer, processor, config.selection.clone());
        o.sources = config.sources.iter().map(SourceSlot::from_spec).collect();
        o
    }

    pub fn with_source(mut self, slot: SourceSlot) -> Self {
        self.sources.push(slot);
        self
    }

    /// Reload filter and query settings from `path` at each cycle start.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles
    }

    pub fn delivered_urls(&self) -> &HashSet<String> {
        &self.delivered_urls
    }

    /// Refresh per-source queries/filters and selection settings. Sources are
    /// matched by name; new entries get an adapter, entries no longer
    /// configured are kept as they were.
    fn reload(&mut self) {
        let Some(path) = &self.config_path else {
            return;
        };
        let cfg = match AgentConfig::load_from(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), path = %path.display(), "config reload failed, keeping previous settings");
                return;
            }
        };
        for spec in &cfg.sources {
            match self.sources.iter_mut().find(|s| s.name == spec.name) {
                Some(slot) => {
                    slot.queries = spec.queries.clone();
                    slot.filter = spec.filter.clone();
                }
                None => {
                    tracing::info!(source = %spec.name, "new source from config reload");
                    self.sources.push(SourceSlot::from_spec(spec));
                }
            }
        }
        self.selection = cfg.selection;
        if !cfg.delivery.recipient.is_empty() {
            self.processor.set_recipient(cfg.delivery.recipient);
        }
        tracing::debug!(path = %path.display(), "config reloaded");
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// One cycle with an explicit clock for age checks.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        self.reload();
        self.cycles += 1;
        let cycle = self.cycles;
        tracing::info!(target: "cycle", cycle, sources = self.sources.len(), "cycle started");

        let mut reports = Vec::with_capacity(self.sources.len());
        let mut chosen: Vec<ScoredItem> = Vec::new();
        let mut seen_this_cycle = HashSet::new();

        for slot in &self.sources {
            let (report, selected) = self.run_source(slot, &mut seen_this_cycle, now).await;
            reports.push(report);
            chosen.extend(selected);
        }

        if let Some(max) = self.selection.global_max_items {
            if chosen.len() > max {
                tracing::info!(target: "cycle", kept = max, dropped = chosen.len() - max, "global cap applied");
                chosen.truncate(max);
            }
        }

        let outcomes = self.processor.process_batch(&chosen).await;
        if self.selection.dedup_across_cycles {
            for o in outcomes.iter().filter(|o| o.delivered()) {
                self.delivered_urls.insert(o.url.clone());
            }
        }

        let report = CycleReport {
            cycle,
            started_at: now,
            sources: reports,
            outcomes,
        };
        crate::metrics::record_cycle(&report);
        log_summary(&report);
        report
    }

    async fn run_source(
        &self,
        slot: &SourceSlot,
        seen: &mut HashSet<String>,
        now: DateTime<Utc>,
    ) -> (SourceReport, Vec<ScoredItem>) {
        let filter = match FilterConfig::validate(&slot.filter) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(source = %slot.name, error = %e, "invalid filter config, skipping source");
                return (SourceReport::new(&slot.name, SourceStatus::Skipped(e)), Vec::new());
            }
        };

        let raw = match slot.adapter.collect(&slot.queries).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(source = %slot.name, error = %e, "source unavailable");
                return (
                    SourceReport::new(&slot.name, SourceStatus::Unavailable(e.to_string())),
                    Vec::new(),
                );
            }
        };

        let mut rep = SourceReport::new(&slot.name, SourceStatus::Ok);
        rep.raw_found = raw.len();
        let raw = slot.adapter.eligibility_filter(raw);
        rep.source_filtered = rep.raw_found - raw.len();

        let batch = normalize_all(raw);
        rep.normalized = batch.items.len();
        rep.normalize_failures = batch.failures;

        // only URLs an earlier source selected count as taken
        let mut taken = seen.clone();
        let (mut items, dups) = dedup_by_url(batch.items, &mut taken);
        rep.duplicates = dups;
        if self.selection.dedup_across_cycles {
            let before = items.len();
            items.retain(|i| !self.delivered_urls.contains(&i.url));
            rep.previously_delivered = before - items.len();
        }

        let sel = select(items, &filter, &self.scorer, now).await;
        rep.ineligible = sel.ineligible;
        rep.below_threshold = sel.below_threshold;
        rep.selected = sel.selected.len();
        seen.extend(sel.selected.iter().map(|s| s.item().url.clone()));

        tracing::debug!(
            source = %slot.name,
            raw = rep.raw_found,
            normalized = rep.normalized,
            selected = rep.selected,
            "source done"
        );
        (rep, sel.selected)
    }

    /// Run cycles every `interval` on a background task until the handle is
    /// stopped. With `run_now` the first cycle starts immediately.
    pub fn spawn(mut self, interval: Duration, run_now: bool) -> OrchestratorHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if !run_now {
                // first tick completes immediately
                ticker.tick().await;
            }
            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        self.run_cycle().await;
                    }
                }
            }
            tracing::info!(cycles = self.cycles, "orchestrator stopped");
            self
        });
        OrchestratorHandle { stop_tx, join }
    }
}

pub struct OrchestratorHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<Orchestrator>,
}

impl OrchestratorHandle {
    /// Signal shutdown and wait for the loop. A cycle in progress runs to
    /// completion first.
    pub async fn stop(self) -> anyhow::Result<Orchestrator> {
        let _ = self.stop_tx.send(true);
        let orch = self.join.await?;
        Ok(orch)
    }
}

fn log_summary(r: &CycleReport) {
    let sum = |f: fn(&SourceReport) -> usize| r.sources.iter().map(f).sum::<usize>();
    let skipped = r
        .sources
        .iter()
        .filter(|s| matches!(s.status, SourceStatus::Skipped(_)))
        .count();
    let unavailable = r
        .sources
        .iter()
        .filter(|s| matches!(s.status, SourceStatus::Unavailable(_)))
        .count();
    tracing::info!(
        target: "cycle",
        cycle = r.cycle,
        raw = sum(|s| s.raw_found),
        normalized = sum(|s| s.normalized),
        normalize_failures = sum(|s| s.normalize_failures),
        duplicates = sum(|s| s.duplicates + s.previously_delivered),
        selected = r.selected(),
        delivered = r.delivered(),
        failed = r.failed(),
        skipped,
        unavailable,
        "cycle finished"
    );
}
