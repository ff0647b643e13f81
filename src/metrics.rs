// src/metrics.rs
use std::sync::Once;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::orchestrator::{CycleReport, SourceStatus};

static DESCRIBE: Once = Once::new();

pub fn ensure_metrics_described() {
    DESCRIBE.call_once(|| {
        describe_counter!("curator_raw_items_total", "Raw records returned by sources");
        describe_counter!("curator_normalized_total", "Records normalized into content items");
        describe_counter!("curator_normalize_failures_total", "Records dropped by the normalizer");
        describe_counter!("curator_duplicates_total", "Items dropped as duplicate URLs");
        describe_counter!("curator_selected_total", "Items selected for processing");
        describe_counter!("curator_delivered_total", "Items delivered");
        describe_counter!("curator_failed_total", "Items that failed synthesis or delivery");
        describe_counter!("curator_source_errors_total", "Sources unavailable for a cycle");
        describe_counter!("curator_sources_skipped_total", "Sources skipped for invalid config");
        describe_counter!("curator_oracle_fallbacks_total", "Oracle scores replaced by the heuristic");
        describe_gauge!("curator_last_cycle_ts", "Unix time of the last finished cycle");
    });
}

/// Push one cycle's counts into the installed recorder (no-op without one).
pub fn record_cycle(report: &CycleReport) {
    ensure_metrics_described();
    for s in &report.sources {
        let src = s.name.clone();
        match &s.status {
            SourceStatus::Skipped(_) => {
                counter!("curator_sources_skipped_total", "source" => src).increment(1);
                continue;
            }
            SourceStatus::Unavailable(_) => {
                counter!("curator_source_errors_total", "source" => src).increment(1);
                continue;
            }
            SourceStatus::Ok => {}
        }
        counter!("curator_raw_items_total", "source" => src.clone()).increment(s.raw_found as u64);
        counter!("curator_normalized_total", "source" => src.clone()).increment(s.normalized as u64);
        counter!("curator_normalize_failures_total", "source" => src.clone())
            .increment(s.normalize_failures as u64);
        counter!("curator_duplicates_total", "source" => src.clone())
            .increment((s.duplicates + s.previously_delivered) as u64);
        counter!("curator_selected_total", "source" => src).increment(s.selected as u64);
    }
    counter!("curator_delivered_total").increment(report.delivered() as u64);
    counter!("curator_failed_total").increment(report.failed() as u64);
    gauge!("curator_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Wrap an existing handle (tests build one without installing it).
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
