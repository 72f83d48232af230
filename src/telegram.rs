//! # telegram — Telegram Bot API transport
//!
//! เชื่อมต่อ Telegram Bot API ตรงๆ ผ่าน reqwest.
//!
//! Only the calls the daemon needs: `getMe` (once at startup),
//! `getUpdates` (long polling) and `sendMessage`.  Every response is wrapped in the Bot API envelope
//! `{ "ok": bool, "result": ..., "description": "..." }`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::AppError;
use crate::models::ChatId;

/// Seconds Telegram may hold a `getUpdates` request open.
pub const LONG_POLL_SECS: u64 = 30;

// ─── Seam ─────────────────────────────────────────────────────────────────────

/// Send-message primitive used by the notifier and the `/start` reply.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), AppError>;
}

/// Source of inbound updates for the command poller.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates with `update_id >= offset`, waiting up to [`LONG_POLL_SECS`].
    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, AppError>;
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message:   Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

/// The bot's own account, from `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok:          bool,
    result:      Option<T>,
    description: Option<String>,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text:    &'a str,
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    offset:          i64,
    timeout:         u64,
    allowed_updates: &'a [&'a str],
}

// ─── Client ───────────────────────────────────────────────────────────────────

pub struct TelegramBot {
    client:   reqwest::Client,
    base_url: String,
}

impl TelegramBot {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: format!("{}/bot{}", config.telegram_api_url, config.telegram_token),
        }
    }

    /// Who am I?  The username decides which `/cmd@name` messages are ours.
    pub async fn get_me(&self) -> Result<BotUser, AppError> {
        self.call("getMe", &serde_json::json!({}), Duration::from_secs(10))
            .await
            .map_err(AppError::BotApi)
    }

    /// POST a Bot API method and unwrap the envelope.
    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, String>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.base_url);

        // reqwest errors carry the URL, which contains the token
        let resp = self
            .client
            .post(&url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| format!("{method} unreachable: {}", e.without_url()))?;

        let status = resp.status();
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| format!("{method} HTTP {status}: unparsable body: {}", e.without_url()))?;

        match envelope {
            Envelope { ok: true, result: Some(result), .. } => Ok(result),
            Envelope { description, .. } => Err(format!(
                "{method} HTTP {status}: {}",
                description.unwrap_or_else(|| "no description".into())
            )),
        }
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), AppError> {
        let body = SendMessageRequest { chat_id, text };

        self.call::<_, serde_json::Value>("sendMessage", &body, Duration::from_secs(10))
            .await
            .map_err(|reason| AppError::DeliveryFailed { chat_id, reason })?;

        debug!(chat_id, "Message delivered");
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramBot {
    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, AppError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: LONG_POLL_SECS,
            allowed_updates: &["message"],
        };

        // leave headroom over the server-side hold time
        self.call("getUpdates", &body, Duration::from_secs(LONG_POLL_SECS + 10))
            .await
            .map_err(AppError::BotApi)
    }
}
