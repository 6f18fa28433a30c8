use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::paper::PaperRecord;
use crate::throttle::Throttle;

const PAPER_CARD_TITLE: &str = "👑 Top-venue paper radar";
const EMPTY_CARD_TITLE: &str = "☕ Paper radar scan complete";
const EMPTY_CARD_BODY: &str = "**Scan finished.**\n\n\
    A fresh pass over the configured venues and keywords found **no** new papers \
    since the last report.\n\n\
    The radar keeps watching and will report at the next scheduled time. ☕️";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Webhook rejected the card: code={code}, msg={msg}")]
    Rejected { code: i64, msg: String },
    #[error("Unrecognized webhook response (HTTP {status}): {body}")]
    Unrecognized { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post one paper card. `paper.ai_summary` should already be set.
    async fn notify_paper(&self, paper: &PaperRecord) -> Result<(), NotifyError>;
    /// Post the "nothing new" card.
    async fn notify_empty_scan(&self) -> Result<(), NotifyError>;
}

/// Interactive card for one paper.
pub fn paper_card(paper: &PaperRecord) -> Value {
    let body = format!(
        "**📄 Title:**\n{}\n\n**👥 Authors:** {}\n**📅 Published:** {}\n\n**💡 Summary:**\n{}",
        paper.display_title,
        paper.author_line(),
        paper.publication_date,
        paper.ai_summary,
    );
    json!({
        "msg_type": "interactive",
        "card": {
            "config": { "wide_screen_mode": true },
            "header": {
                "title": { "tag": "plain_text", "content": PAPER_CARD_TITLE },
                "template": "red"
            },
            "elements": [
                { "tag": "markdown", "content": body },
                { "tag": "hr" },
                {
                    "tag": "action",
                    "actions": [{
                        "tag": "button",
                        "text": { "tag": "plain_text", "content": "🔗 Read the paper" },
                        "type": "primary",
                        "url": paper.link
                    }]
                }
            ]
        }
    })
}

/// Interactive card sent when a scan finds nothing new.
pub fn empty_scan_card() -> Value {
    json!({
        "msg_type": "interactive",
        "card": {
            "config": { "wide_screen_mode": true },
            "header": {
                "title": { "tag": "plain_text", "content": EMPTY_CARD_TITLE },
                "template": "grey"
            },
            "elements": [
                { "tag": "markdown", "content": EMPTY_CARD_BODY }
            ]
        }
    })
}

#[derive(Deserialize)]
struct WebhookResponse {
    code: Option<i64>,
    msg: Option<String>,
}

/// Success means a JSON body whose `code` is 0, whatever the HTTP status.
fn classify_response(status: u16, body: &str) -> Result<(), NotifyError> {
    let parsed: Option<WebhookResponse> = serde_json::from_str(body).ok();
    match parsed {
        Some(WebhookResponse { code: Some(0), .. }) => Ok(()),
        Some(WebhookResponse {
            code: Some(code),
            msg,
        }) => Err(NotifyError::Rejected {
            code,
            msg: msg.unwrap_or_default(),
        }),
        _ => Err(NotifyError::Unrecognized {
            status,
            body: body.chars().take(200).collect(),
        }),
    }
}

/// Posts cards to a Feishu custom-bot webhook.
pub struct FeishuNotifier {
    client: reqwest::Client,
    webhook_url: String,
    throttle: Throttle,
}

impl FeishuNotifier {
    pub fn new(
        webhook_url: String,
        timeout: Duration,
        notify_delay: Duration,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("paper-radar/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()?,
            webhook_url,
            throttle: Throttle::new(notify_delay),
        })
    }

    async fn post(&self, payload: &Value) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.webhook_url).json(payload).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        classify_response(status, &body)
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    async fn notify_paper(&self, paper: &PaperRecord) -> Result<(), NotifyError> {
        self.throttle.wait().await;
        self.post(&paper_card(paper)).await
    }

    async fn notify_empty_scan(&self) -> Result<(), NotifyError> {
        self.post(&empty_scan_card()).await
    }
}
