//! Text-generation oracle: provider abstraction + file cache + daily limit.
//!
//! The scorer and the PRD generator only see `TextOracle`; everything about
//! transport, caching and quotas stays behind it.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ai::AiConfig;
use crate::error::OracleError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

pub type OracleFuture<'a> = Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Stateless request/response text generation.
pub trait TextOracle: Send + Sync {
    fn complete<'a>(&'a self, req: &'a CompletionRequest) -> OracleFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynOracle = Arc<dyn TextOracle>;

/// Factory: build an oracle according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock.
/// * Else if `config.enabled == false`, returns `None`.
/// * Else builds the OpenAI provider wrapped with caching + daily limit.
pub fn build_oracle(config: &AiConfig) -> anyhow::Result<Option<DynOracle>> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Some(Arc::new(MockOracle::canned())));
    }

    if !config.enabled {
        return Ok(None);
    }

    match config.provider.as_str() {
        "openai" => {
            let provider = OpenAiProvider::new(
                config.api_key.clone(),
                &config.model,
                Duration::from_secs(config.timeout_secs),
            )?;
            let client = CachingClient::new(provider, default_cache_dir(), config.daily_limit);
            Ok(Some(Arc::new(client)))
        }
        other => anyhow::bail!("unsupported AI provider: {other}"),
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does a *real* remote call. Separated so the same
/// caching wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(&'a self, req: &'a CompletionRequest) -> OracleFuture<'a>;
    fn name(&self) -> &'static str;
}

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("ai-alpha-agent/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(&'a self, req: &'a CompletionRequest) -> OracleFuture<'a> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(OracleError::Request("missing API key".into()));
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let body = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: &req.system,
                    },
                    Msg {
                        role: "user",
                        content: &req.prompt,
                    },
                ],
                temperature: req.temperature,
                max_tokens: req.max_tokens,
            };

            let resp = self
                .http
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| OracleError::Request(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(OracleError::Status(resp.status().as_u16()));
            }
            let parsed: Resp = resp
                .json()
                .await
                .map_err(|e| OracleError::Request(e.to_string()))?;
            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
            if content.trim().is_empty() {
                return Err(OracleError::Empty);
            }
            Ok(content)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always errors; used where an oracle is required but none is configured.
pub struct DisabledOracle;

impl TextOracle for DisabledOracle {
    fn complete<'a>(&'a self, _req: &'a CompletionRequest) -> OracleFuture<'a> {
        Box::pin(async { Err(OracleError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

type Responder = dyn Fn(&CompletionRequest) -> Result<String, OracleError> + Send + Sync;

/// Scriptable oracle for tests and local runs.
#[derive(Clone)]
pub struct MockOracle {
    responder: Arc<Responder>,
    calls: Arc<AtomicUsize>,
}

impl MockOracle {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(f),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Valid rubric JSON for scoring prompts, a short paragraph otherwise.
    pub fn canned() -> Self {
        Self::new(|req| {
            if req.prompt.contains("final_score") {
                Ok(r#"{"technical_score": 7, "practical_score": 7, "timeliness_score": 8, "quality_score": 6, "final_score": 0.7}"#.to_string())
            } else {
                Ok("Mock section text.".to_string())
            }
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextOracle for MockOracle {
    fn complete<'a>(&'a self, req: &'a CompletionRequest) -> OracleFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = (self.responder)(req);
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

impl Provider for MockOracle {
    fn fetch<'a>(&'a self, req: &'a CompletionRequest) -> OracleFuture<'a> {
        self.complete(req)
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Mutex<DailyCounter>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            tracing::warn!(error = %e, dir = %cache_dir.display(), "oracle cache dir unavailable");
        }
        let counter = Mutex::new(load_daily_counter(&cache_dir).unwrap_or_default());
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    async fn complete_impl(&self, req: &CompletionRequest) -> Result<String, OracleError> {
        // 1) Cache lookup; hits do not count against the limit.
        let key = cache_key(self.inner.name(), req);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            return Ok(hit.text);
        }

        // 2) Daily limit.
        {
            let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
            if g.is_expired() {
                g.reset_to_today();
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit_max {
                return Err(OracleError::DailyLimit(self.daily_limit_max));
            }
        }

        // 3) Real call.
        let text = self.inner.fetch(req).await?;
        let _ = write_cache_file(&self.cache_dir, &key, &CachedCompletion { text: text.clone() });
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.count = g.count.saturating_add(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
        Ok(text)
    }
}

impl<P: Provider> TextOracle for CachingClient<P> {
    fn complete<'a>(&'a self, req: &'a CompletionRequest) -> OracleFuture<'a> {
        Box::pin(self.complete_impl(req))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCompletion {
    text: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/ai")
}

fn cache_key(provider: &str, req: &CompletionRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update([0u8]);
    hasher.update(req.system.as_bytes());
    hasher.update([0u8]);
    hasher.update(req.prompt.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(12).map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedCompletion> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedCompletion) -> io::Result<()> {
    let json = serde_json::to_vec(value).map_err(io::Error::other)?;
    write_atomic(&cache_path(dir, key), &json)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let json = serde_json::to_vec(dc).map_err(io::Error::other)?;
    write_atomic(&counter_path(dir), &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            system: "sys".into(),
            prompt: prompt.into(),
            max_tokens: 10,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn cache_hit_skips_provider_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOracle::fixed("hello");
        let client = CachingClient::new(mock.clone(), dir.path().to_path_buf(), 1);

        assert_eq!(client.complete(&req("a")).await.unwrap(), "hello");
        assert_eq!(client.complete(&req("a")).await.unwrap(), "hello");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn daily_limit_stops_real_calls() {
        let dir = tempfile::tempdir().unwrap();
        let client = CachingClient::new(MockOracle::fixed("x"), dir.path().to_path_buf(), 1);
        assert!(client.complete(&req("a")).await.is_ok());
        assert!(matches!(
            client.complete(&req("b")).await,
            Err(OracleError::DailyLimit(1))
        ));
    }

    #[tokio::test]
    async fn provider_errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOracle::new(|_| Err(OracleError::Status(500)));
        let client = CachingClient::new(mock.clone(), dir.path().to_path_buf(), 10);
        assert!(client.complete(&req("a")).await.is_err());
        assert!(client.complete(&req("a")).await.is_err());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_oracle_errors() {
        assert!(matches!(
            DisabledOracle.complete(&req("a")).await,
            Err(OracleError::Disabled)
        ));
    }
}
