use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod apis;
mod config;
mod history;
mod notify;
mod paper;
mod scan;
mod schedule;
mod summarize;
mod throttle;

use apis::semantic_scholar::{self, SemanticScholarClient};
use config::Config;
use history::HistoryStore;
use notify::FeishuNotifier;
use scan::Radar;
use summarize::ChatSummarizer;

/// Config path: first CLI argument, then `PAPER_RADAR_CONFIG`, then the default.
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("PAPER_RADAR_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH))
}

fn run_once() -> bool {
    std::env::var("PAPER_RADAR_ONCE")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn build_radar(config: &Config) -> anyhow::Result<Radar> {
    let source = SemanticScholarClient::new(
        semantic_scholar::BASE_URL,
        config.semantic_scholar_api_key.clone(),
        config.http_timeout,
        config.scan.search_delay,
    )
    .context("Failed to build Semantic Scholar client")?;
    let summarizer = ChatSummarizer::new(&config.llm, config.llm_api_key.clone())
        .context("Failed to build LLM client")?;
    let notifier = FeishuNotifier::new(
        config.webhook_url.clone(),
        config.http_timeout,
        config.scan.notify_delay,
    )
    .context("Failed to build webhook client")?;

    Ok(Radar {
        config: config.scan.clone(),
        source: Arc::new(source),
        summarizer: Arc::new(summarizer),
        notifier: Arc::new(notifier),
        history: HistoryStore::new(&config.history_path),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let path = config_path();
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    tracing::info!(
        "Starting paper radar: {} keywords, schedule={:?}, history={}",
        config.scan.keywords.len(),
        config
            .scan
            .schedule_times
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect::<Vec<_>>(),
        config.history_path.display()
    );

    let radar = build_radar(&config)?;

    if run_once() {
        let report = radar.run_scan().await?;
        tracing::info!("Single scan done: {:?}", report);
        return Ok(());
    }

    schedule::run(&radar, &config.scan.schedule_times).await?;
    Ok(())
}
