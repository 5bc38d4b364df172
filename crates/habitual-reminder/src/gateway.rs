use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::SendError;

/// Provider acknowledgement for a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub message_id: Option<i64>,
}

/// Outbound notification sink. Implementations may fail for any reason; the
/// caller treats every failure as "not delivered".
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, recipient: i64, text: &str) -> Result<Ack, SendError>;
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    /// Base URL of the Bot API, without trailing slash.
    pub api_base: String,
    pub timeout: Duration,
}

/// Telegram Bot API `sendMessage` adapter.
pub struct TelegramGateway {
    client: reqwest::Client,
    send_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
    error_code: Option<u16>,
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramGateway {
    pub fn new(config: TelegramConfig) -> anyhow::Result<Self> {
        if config.token.trim().is_empty() {
            anyhow::bail!("telegram bot token is empty");
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let send_url = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.token.trim()
        );
        Ok(Self {
            client,
            send_url,
            timeout: config.timeout,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> SendError {
        if e.is_timeout() {
            SendError::Timeout(self.timeout)
        } else {
            // The URL carries the bot token
            SendError::Network(e.without_url().to_string())
        }
    }
}

#[async_trait]
impl NotificationGateway for TelegramGateway {
    async fn send(&self, recipient: i64, text: &str) -> Result<Ack, SendError> {
        let body = json!({
            "chat_id": recipient,
            "text": text,
        });

        let response = self
            .client
            .post(&self.send_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let raw = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!("telegram sendMessage chat_id={} status={}", recipient, status);

        interpret_response(status, &raw)
    }
}

/// Map a Bot API reply to an outcome. Success needs both a 2xx status and
/// `"ok": true` in the body.
fn interpret_response(status: StatusCode, raw: &str) -> Result<Ack, SendError> {
    let parsed = serde_json::from_str::<TelegramResponse>(raw);

    if !status.is_success() {
        let description = match &parsed {
            Ok(resp) => resp.description.clone().unwrap_or_default(),
            Err(_) => raw.chars().take(200).collect(),
        };
        return Err(SendError::Rejected {
            status: status.as_u16(),
            description,
        });
    }

    let resp = parsed.map_err(|e| SendError::MalformedResponse(e.to_string()))?;
    if !resp.ok {
        return Err(SendError::Rejected {
            status: resp.error_code.unwrap_or(status.as_u16()),
            description: resp.description.unwrap_or_default(),
        });
    }

    Ok(Ack {
        message_id: resp.result.map(|m| m.message_id),
    })
}
