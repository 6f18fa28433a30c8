pub mod semantic_scholar;

use async_trait::async_trait;
use thiserror::Error;

/// A paper as returned by a search API, before filtering and formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePaper {
    pub title: String,
    pub abstract_text: Option<String>,
    pub url: Option<String>,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub publication_date: Option<String>,
    pub authors: Vec<String>,
}

/// Parameters for one keyword search.
#[derive(Debug, Clone, Copy)]
pub struct SearchQuery<'a> {
    pub keyword: &'a str,
    /// Comma-joined venue allow-list.
    pub venues: &'a str,
    /// Year range such as `2025-2026`.
    pub year_window: &'a str,
    pub fetch_limit: u32,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },
}

#[async_trait]
pub trait PaperSource: Send + Sync {
    fn name(&self) -> &str;
    async fn search(&self, query: SearchQuery<'_>) -> Result<Vec<CandidatePaper>, SourceError>;
}
