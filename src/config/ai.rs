// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

const ENV_PATH: &str = "AI_CONFIG_PATH";
pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_daily_limit() -> u32 {
    200
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Only "openai" is wired up.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Real API calls per day; cache hits are free.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            daily_limit: default_daily_limit(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.to_lowercase();

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY").unwrap_or_default(),
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }
        if cfg.enabled && cfg.api_key.trim().is_empty() {
            tracing::warn!("AI enabled but no API key configured; oracle calls will fail");
        }

        cfg.timeout_secs = cfg.timeout_secs.max(1);
        Ok(cfg)
    }

    /// Load from `$AI_CONFIG_PATH` or `config/ai.json`. Unreadable or invalid
    /// config yields the disabled default.
    pub fn load_default() -> Self {
        let path = env::var(ENV_PATH).unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.to_string());
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!(error = %e, path = %path, "AI config not loaded; oracle disabled");
                Self::default()
            }
        }
    }
}
