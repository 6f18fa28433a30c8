use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;
use thiserror::Error;

use crate::apis::semantic_scholar::MAX_LIMIT;

pub const DEFAULT_CONFIG_PATH: &str = "radar.yaml";
const DEFAULT_HISTORY_PATH: &str = "pushed_history.json";
const DEFAULT_LLM_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
const DEFAULT_LLM_MODEL: &str = "glm-4-flash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Required environment variable {0} is not set")]
    MissingSecret(&'static str),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Scan parameters, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub keywords: Vec<String>,
    /// Comma-joined venue allow-list.
    pub venues: String,
    pub max_per_keyword: usize,
    pub max_total: usize,
    /// Candidates requested per keyword; leaves headroom for the abstract filter.
    pub fetch_limit: u32,
    pub schedule_times: Vec<NaiveTime>,
    pub search_delay: Duration,
    pub notify_delay: Duration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    /// Language the summary is written in.
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            language: "Chinese".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Everything the radar needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub scan: ScanConfig,
    pub llm: LlmSettings,
    pub llm_api_key: String,
    pub webhook_url: String,
    pub semantic_scholar_api_key: Option<String>,
    pub history_path: PathBuf,
    pub http_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VenueList {
    Joined(String),
    List(Vec<String>),
}

impl VenueList {
    fn joined(&self) -> String {
        match self {
            VenueList::Joined(s) => s
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(","),
            VenueList::List(list) => list
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    keywords: Vec<String>,
    venues: VenueList,
    #[serde(default = "default_max_per_keyword")]
    max_per_keyword: usize,
    #[serde(default = "default_max_total")]
    max_total: usize,
    #[serde(default = "default_schedule_times")]
    schedule_times: Vec<String>,
    fetch_limit: Option<u32>,
    #[serde(default = "default_search_delay_ms")]
    search_delay_ms: u64,
    #[serde(default = "default_notify_delay_ms")]
    notify_delay_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    http_timeout_secs: u64,
    history_path: Option<PathBuf>,
    #[serde(default)]
    llm: LlmSettings,
}

fn default_max_per_keyword() -> usize {
    1
}

fn default_max_total() -> usize {
    3
}

fn default_schedule_times() -> Vec<String> {
    vec!["08:30".to_string(), "18:30".to_string()]
}

fn default_search_delay_ms() -> u64 {
    1000
}

fn default_notify_delay_ms() -> u64 {
    2000
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load `.env`, the YAML file at `path`, and secrets from the process
    /// environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // A missing .env is normal in production.
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw, |key| std::env::var(key).ok())
    }

    /// Build a config from YAML text and an environment lookup.
    pub fn from_yaml<F>(yaml: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = serde_yaml::from_str(yaml)?;
        let secret = |key: &'static str| -> Result<String, ConfigError> {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingSecret(key))
        };

        let llm_api_key = secret("ZHIPU_API_KEY")?;
        let webhook_url = secret("FEISHU_WEBHOOK_URL")?;
        let semantic_scholar_api_key = env("SEMANTIC_SCHOLAR_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let scan = file.validate_scan()?;
        if file.llm.model.trim().is_empty() || file.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "llm.model and llm.base_url must not be empty".into(),
            ));
        }

        Ok(Self {
            scan,
            llm: file.llm,
            llm_api_key,
            webhook_url,
            semantic_scholar_api_key,
            history_path: file
                .history_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH)),
            http_timeout: Duration::from_secs(file.http_timeout_secs.max(1)),
        })
    }
}

impl FileConfig {
    fn validate_scan(&self) -> Result<ScanConfig, ConfigError> {
        let mut keywords: Vec<String> = Vec::new();
        for kw in self.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            if !keywords.iter().any(|k| k == kw) {
                keywords.push(kw.to_string());
            }
        }
        if keywords.is_empty() {
            return Err(ConfigError::Invalid("keywords must not be empty".into()));
        }

        let venues = self.venues.joined();
        if venues.is_empty() {
            return Err(ConfigError::Invalid("venues must not be empty".into()));
        }

        if self.max_per_keyword < 1 {
            return Err(ConfigError::Invalid("max_per_keyword must be at least 1".into()));
        }
        if self.max_total < 1 {
            return Err(ConfigError::Invalid("max_total must be at least 1".into()));
        }

        let default_limit = (self.max_per_keyword as u32).saturating_mul(3);
        let fetch_limit = self.fetch_limit.unwrap_or(default_limit).min(MAX_LIMIT);
        if (fetch_limit as usize) < self.max_per_keyword {
            return Err(ConfigError::Invalid(format!(
                "fetch_limit ({}) must be at least max_per_keyword ({}) and at most {}",
                fetch_limit, self.max_per_keyword, MAX_LIMIT
            )));
        }

        let mut schedule_times = Vec::with_capacity(self.schedule_times.len());
        for raw in &self.schedule_times {
            let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
                ConfigError::Invalid(format!("schedule time {:?} is not HH:MM", raw))
            })?;
            schedule_times.push(time);
        }

        Ok(ScanConfig {
            keywords,
            venues,
            max_per_keyword: self.max_per_keyword,
            max_total: self.max_total,
            fetch_limit,
            schedule_times,
            search_delay: Duration::from_millis(self.search_delay_ms),
            notify_delay: Duration::from_millis(self.notify_delay_ms),
        })
    }
}
