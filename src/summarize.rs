use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LlmSettings;
use crate::paper::PaperRecord;

const SYSTEM_PROMPT: &str = "You are a rigorous academic assistant for embodied AI and robotics research.";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Model returned an empty completion")]
    Empty,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, paper: &PaperRecord) -> Result<String, SummarizeError>;
}

/// Text shown in place of a summary when the model call fails.
pub fn failure_placeholder(err: &SummarizeError) -> String {
    format!("⚠️ AI summary failed: {}", err)
}

/// Build the user prompt for one paper.
pub fn build_prompt(paper: &PaperRecord, language: &str) -> String {
    format!(
        "Read the abstract of this recently published paper and summarize it in {language}.\n\
         Use exactly this structure:\n\
         **Pain point:** one plain sentence naming the problem it solves.\n\
         **Approach:** one or two sentences on the technical method.\n\
         **Innovations:**\n\
         - first core innovation\n\
         - second core innovation\n\
         Rules: be professional and concise. Do not open with filler such as \
         \"This paper\", \"In summary\" or \"Overall\", do not repeat the title, \
         and do not add any text outside the structure.\n\n\
         Title: {title}\n\
         Abstract: {abstract_text}",
        language = language,
        title = paper.display_title,
        abstract_text = paper.abstract_text,
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn parse_completion(body: &str) -> Result<String, SummarizeError> {
    let resp: ChatResponse =
        serde_json::from_str(body).map_err(|e| SummarizeError::Parse(e.to_string()))?;
    resp.choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(SummarizeError::Empty)
}

/// Chat-completions client for Zhipu GLM or any OpenAI-compatible endpoint.
pub struct ChatSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    language: String,
}

impl ChatSummarizer {
    pub fn new(settings: &LlmSettings, api_key: String) -> Result<Self, SummarizeError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("paper-radar/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(settings.timeout_secs))
                .build()?,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key,
            model: settings.model.clone(),
            language: settings.language.clone(),
        })
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, paper: &PaperRecord) -> Result<String, SummarizeError> {
        let prompt = build_prompt(paper, &self.language);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::CandidatePaper;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn paper() -> PaperRecord {
        PaperRecord::from_candidate(
            CandidatePaper {
                title: "Dexterous Grasping with Tactile Diffusion".to_string(),
                abstract_text: Some("We learn grasps from touch.".to_string()),
                venue: Some("RSS".to_string()),
                year: Some(2026),
                ..Default::default()
            },
            2026,
        )
        .unwrap()
    }

    #[test]
    fn test_prompt_embeds_title_and_abstract() {
        let prompt = build_prompt(&paper(), "Chinese");
        assert!(prompt.contains("Title: [RSS 2026] Dexterous Grasping with Tactile Diffusion"));
        assert!(prompt.contains("Abstract: We learn grasps from touch."));
        assert!(prompt.contains("summarize it in Chinese"));
        assert!(prompt.contains("**Innovations:**"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt(&paper(), "English"), build_prompt(&paper(), "English"));
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
          "id": "1",
          "model": "glm-4-flash",
          "choices": [{"index": 0, "finish_reason": "stop",
                       "message": {"role": "assistant", "content": "  **Pain point:** grasping.\n"}}]
        }"#;
        assert_eq!(parse_completion(body).unwrap(), "**Pain point:** grasping.");
    }

    #[test]
    fn test_parse_completion_empty_choices() {
        let err = parse_completion(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, SummarizeError::Empty));

        let err = parse_completion(r#"{"choices": [{"message": {"content": "   "}}]}"#).unwrap_err();
        assert!(matches!(err, SummarizeError::Empty));
    }

    #[test]
    fn test_parse_completion_error_body() {
        let err = parse_completion("upstream connect error").unwrap_err();
        assert!(matches!(err, SummarizeError::Parse(_)));
    }

    #[test]
    fn test_failure_placeholder_is_marked() {
        let text = failure_placeholder(&SummarizeError::Api {
            status: 401,
            body: "invalid api key".to_string(),
        });
        assert!(text.starts_with("⚠️ AI summary failed"));
        assert!(text.contains("401"));
    }

    fn summarizer(base_url: String) -> ChatSummarizer {
        let settings = LlmSettings {
            base_url,
            timeout_secs: 5,
            ..Default::default()
        };
        ChatSummarizer::new(&settings, "zk-test".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_summarize_sends_roles_and_bearer_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer zk-test")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({ "model": "glm-4-flash" })),
                Matcher::Regex(r#""role":"system""#.to_string()),
                Matcher::Regex(r#""role":"user""#.to_string()),
                Matcher::Regex("Dexterous Grasping with Tactile Diffusion".to_string()),
                Matcher::Regex("We learn grasps from touch".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "index": 0,
                        "message": { "role": "assistant", "content": "**Pain point:** grasping." }
                    }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let summary = summarizer(server.url()).summarize(&paper()).await.unwrap();
        assert_eq!(summary, "**Pain point:** grasping.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_summarize_http_error_is_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"code":"1000","message":"invalid api key"}}"#)
            .create_async()
            .await;

        let err = summarizer(server.url()).summarize(&paper()).await.unwrap_err();
        assert!(matches!(err, SummarizeError::Api { status: 401, .. }));
        assert!(failure_placeholder(&err).contains("invalid api key"));
    }
}
