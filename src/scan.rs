use std::sync::Arc;

use chrono::Datelike;
use thiserror::Error;

use crate::aggregate::{self, AggregatePlan};
use crate::apis::PaperSource;
use crate::config::ScanConfig;
use crate::history::{HistoryError, HistoryStore};
use crate::notify::Notifier;
use crate::summarize::{self, Summarizer};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Cannot start scan: {0}")]
    History(#[from] HistoryError),
}

/// Outcome of one scan, for logging.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub papers: usize,
    pub summary_failures: usize,
    pub notify_failures: usize,
    pub persist_failures: usize,
}

/// The scan pipeline with its collaborators, built once at startup.
pub struct Radar {
    pub config: ScanConfig,
    pub source: Arc<dyn PaperSource>,
    pub summarizer: Arc<dyn Summarizer>,
    pub notifier: Arc<dyn Notifier>,
    pub history: HistoryStore,
}

impl Radar {
    /// Run one scan using the local clock's year.
    pub async fn run_scan(&self) -> Result<ScanReport, ScanError> {
        self.run_scan_for_year(chrono::Local::now().year()).await
    }

    /// Fetch, dedup, summarize and notify once.
    ///
    /// Each pushed title is written to history before the next paper is
    /// processed. Failures inside the per-paper loop are logged and counted,
    /// never returned.
    pub async fn run_scan_for_year(&self, current_year: i32) -> Result<ScanReport, ScanError> {
        tracing::info!(
            "Scan started: {} keywords, venues={}",
            self.config.keywords.len(),
            self.config.venues
        );
        let mut history = self.history.load()?;
        tracing::debug!(
            "Loaded {} pushed titles from {}",
            history.len(),
            self.history.path().display()
        );

        let window = aggregate::year_window(current_year);
        let plan = AggregatePlan {
            keywords: &self.config.keywords,
            venues: &self.config.venues,
            year_window: &window,
            fetch_limit: self.config.fetch_limit,
            max_per_keyword: self.config.max_per_keyword,
            max_total: self.config.max_total,
            current_year,
        };
        let papers = aggregate::aggregate(self.source.as_ref(), &plan, &history).await;

        let mut report = ScanReport::default();
        if papers.is_empty() {
            tracing::info!("No new papers; sending empty-scan notice");
            if let Err(e) = self.notifier.notify_empty_scan().await {
                tracing::warn!("Empty-scan notice failed: {}", e);
                report.notify_failures += 1;
            }
            return Ok(report);
        }

        tracing::info!("{} new papers to push", papers.len());
        for mut paper in papers {
            report.papers += 1;

            paper.ai_summary = match self.summarizer.summarize(&paper).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!("Summary failed for {:?}: {}", paper.raw_title, e);
                    report.summary_failures += 1;
                    summarize::failure_placeholder(&e)
                }
            };

            match self.notifier.notify_paper(&paper).await {
                Ok(()) => tracing::info!("Pushed {:?} ({})", paper.raw_title, paper.venue),
                Err(e) => {
                    tracing::warn!("Push failed for {:?}: {}", paper.raw_title, e);
                    report.notify_failures += 1;
                }
            }

            // Recorded even when the push failed: a missed card beats a duplicate.
            if let Err(e) = self.history.append(&mut history, &paper.raw_title) {
                tracing::error!("Could not persist history for {:?}: {}", paper.raw_title, e);
                report.persist_failures += 1;
            }
        }

        tracing::info!(
            "Scan finished: {} pushed, {} summary failures, {} push failures, {} history write failures",
            report.papers,
            report.summary_failures,
            report.notify_failures,
            report.persist_failures
        );
        Ok(report)
    }
}
