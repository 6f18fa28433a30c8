use super::{CandidatePaper, PaperSource, SearchQuery, SourceError};
use crate::throttle::Throttle;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

const FIELDS: &str = "title,abstract,url,venue,year,authors,publicationDate";

/// Semantic Scholar rejects `limit` above this value.
pub const MAX_LIMIT: u32 = 100;

pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    throttle: Throttle,
}

impl SemanticScholarClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        request_delay: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("paper-radar/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            throttle: Throttle::new(request_delay),
        })
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[derive(Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<S2Paper>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    url: Option<String>,
    venue: Option<String>,
    year: Option<i32>,
    publication_date: Option<String>,
    authors: Option<Vec<S2Author>>,
}

#[derive(Deserialize)]
struct S2Author {
    name: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn s2_to_candidate(p: S2Paper) -> Option<CandidatePaper> {
    let title = non_blank(p.title)?;
    Some(CandidatePaper {
        title,
        abstract_text: non_blank(p.abstract_text),
        url: non_blank(p.url),
        venue: non_blank(p.venue),
        year: p.year,
        publication_date: non_blank(p.publication_date),
        authors: p
            .authors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| non_blank(a.name))
            .collect(),
    })
}

/// Decode a `/paper/search` body. Entries without a title are dropped.
fn parse_search_response(body: &str) -> Result<Vec<CandidatePaper>, SourceError> {
    let resp: S2SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(resp
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(s2_to_candidate)
        .collect())
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    async fn search(&self, query: SearchQuery<'_>) -> Result<Vec<CandidatePaper>, SourceError> {
        self.throttle.wait().await;

        let url = format!("{}/paper/search", self.base_url);
        let limit = query.fetch_limit.clamp(1, MAX_LIMIT).to_string();
        let resp = self
            .add_auth(self.client.get(&url).query(&[
                ("query", query.keyword),
                ("venue", query.venues),
                ("year", query.year_window),
                ("fields", FIELDS),
                ("limit", limit.as_str()),
            ]))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        parse_search_response(&body)
    }
}
