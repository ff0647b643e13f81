//! AI Alpha Agent: binary entrypoint.
//! Loads configuration, wires sources, scorer, PRD synthesis and delivery,
//! then runs one cycle (`RUN_ONCE=1`) or the scheduled loop until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ai_alpha_agent::ai_adapter::{build_oracle, DisabledOracle, DynOracle};
use ai_alpha_agent::analyze::{KeywordSet, Scorer};
use ai_alpha_agent::config::ai::AiConfig;
use ai_alpha_agent::config::{agent, AgentConfig, DocumentTemplates};
use ai_alpha_agent::metrics::Metrics;
use ai_alpha_agent::notify::build_notifier;
use ai_alpha_agent::prd::PrdGenerator;
use ai_alpha_agent::process::ItemProcessor;
use ai_alpha_agent::Orchestrator;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_alpha_agent=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

async fn serve_metrics(addr: SocketAddr) -> Result<()> {
    let metrics = Metrics::init()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    tracing::info!(%addr, "serving /metrics");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics.router()).await {
            tracing::warn!(error = %e, "metrics server stopped");
        }
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr.parse().context("invalid METRICS_ADDR")?;
        serve_metrics(addr).await?;
    }

    let (config, config_path) = AgentConfig::load_default()?;
    if config_path.is_none() {
        tracing::warn!(path = agent::DEFAULT_AGENT_CONFIG_PATH, "no agent config found, running with no sources");
    }
    let ai = AiConfig::load_default();
    let templates = DocumentTemplates::load_default()?;

    let oracle = build_oracle(&ai)?;
    let keywords = match &config.relevance.keywords {
        Some(k) => KeywordSet::new(k.clone()),
        None => KeywordSet::default(),
    };
    let mut scorer = Scorer::heuristic_only(keywords);
    if let (true, Some(o)) = (config.relevance.use_oracle, oracle.clone()) {
        scorer = scorer.with_oracle(o, Duration::from_secs(config.relevance.oracle_timeout_secs));
    } else {
        tracing::info!("oracle scoring off, using keyword heuristic only");
    }

    // Without an oracle every synthesis fails per item and is reported as such.
    let synth_oracle: DynOracle = oracle.unwrap_or_else(|| Arc::new(DisabledOracle));
    let synthesizer = Arc::new(PrdGenerator::new(synth_oracle, templates.clone()));
    let notifier = build_notifier(&config.delivery)?;
    let processor = ItemProcessor::new(
        synthesizer,
        notifier,
        config.delivery.recipient.clone(),
        templates,
    );

    let mut orch = Orchestrator::from_config(&config, scorer, processor);
    if let Some(p) = config_path {
        orch = orch.with_config_path(p);
    }

    if env_flag("RUN_ONCE") {
        let report = orch.run_cycle().await;
        tracing::info!(delivered = report.delivered(), failed = report.failed(), "single run complete");
        return Ok(());
    }

    let interval = Duration::from_secs(config.schedule.interval_secs.max(1));
    let handle = orch.spawn(interval, config.schedule.run_on_start);
    tracing::info!(interval_secs = interval.as_secs(), "scheduler running; Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    tracing::info!("shutdown requested");
    handle.stop().await?;
    Ok(())
}
