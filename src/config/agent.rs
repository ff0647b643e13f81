// src/config/agent.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::filter::RawFilterConfig;

const ENV_PATH: &str = "AGENT_CONFIG_PATH";
pub const DEFAULT_AGENT_CONFIG_PATH: &str = "config/agent.toml";

fn default_interval_secs() -> u64 {
    24 * 3600
}
fn default_true() -> bool {
    true
}
fn default_oracle_timeout_secs() -> u64 {
    20
}
fn default_outbox_dir() -> PathBuf {
    PathBuf::from("outbox")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// Cap over all sources' selections combined; `None` means no cap.
    pub global_max_items: Option<usize>,
    #[serde(default = "default_true")]
    pub dedup_across_cycles: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            global_max_items: None,
            dedup_across_cycles: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceConfig {
    /// Overrides the built-in keyword set when present.
    pub keywords: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub use_oracle: bool,
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            keywords: None,
            use_oracle: true,
            oracle_timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Email,
    Slack,
    #[default]
    Outbox,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub channel: DeliveryChannel,
    #[serde(default)]
    pub recipient: String,
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            channel: DeliveryChannel::default(),
            recipient: String::new(),
            outbox_dir: default_outbox_dir(),
        }
    }
}

/// Source-specific settings, tagged by `kind` in TOML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSettings {
    HackerNews {
        #[serde(default)]
        min_points: i64,
        hits_per_query: Option<u32>,
        base_url: Option<String>,
    },
    Reddit {
        subreddits: Vec<String>,
        #[serde(default)]
        min_score: i64,
        limit: Option<u32>,
        base_url: Option<String>,
    },
    GitHub {
        #[serde(default)]
        min_stars: u64,
        per_page: Option<u32>,
        #[serde(default = "default_true")]
        fetch_readme: bool,
        base_url: Option<String>,
    },
    Feed {
        urls: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceSpec {
    pub name: String,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub filter: RawFilterConfig,
    #[serde(flatten)]
    pub settings: SourceSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl AgentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AgentConfig = toml::from_str(s).context("parsing agent config toml")?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading agent config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallback:
    /// 1) $AGENT_CONFIG_PATH
    /// 2) config/agent.toml
    ///
    /// No file at all yields the default (no sources).
    pub fn load_default() -> Result<(Self, Option<PathBuf>)> {
        match resolve_path()? {
            Some(p) => Ok((Self::load_from(&p)?, Some(p))),
            None => Ok((Self::default(), None)),
        }
    }
}

/// Path the agent config would be loaded from, if any.
pub fn resolve_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_PATH} points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_AGENT_CONFIG_PATH);
    Ok(default.exists().then_some(default))
}
