//! Telegram Bot API implementation of the chat client.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    base::types::RawMessage,
    prelude::*,
};

use super::{ChatClient, GenericChatClient};

// Constants.

const METHOD_GET_UPDATES: &str = "getUpdates";
const METHOD_SEND_MESSAGE: &str = "sendMessage";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Extra methods on `ChatClient` applied by the telegram implementation.

impl ChatClient {
    /// Creates a new Telegram chat client.
    pub fn telegram(config: &Config) -> Res<Self> {
        let client = TelegramChatClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> TelegramResponse<T> {
    fn into_result(self) -> Res<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(anyhow!("Telegram API returned no result.")),
            (false, _) => Err(anyhow!("Telegram API error: {}", self.description.unwrap_or_else(|| "unknown".to_string()))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

impl From<TelegramUpdate> for RawMessage {
    fn from(update: TelegramUpdate) -> Self {
        match update.message {
            Some(message) => RawMessage {
                id: update.update_id,
                chat_id: Some(message.chat.id),
                text: message.text.unwrap_or_default(),
            },
            None => RawMessage::empty(update.update_id),
        }
    }
}

// Structs.

/// Telegram client implementation.
struct TelegramChatClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    initial_retry_period: Duration,
    request_retry_attempts: u32,
    response_retry_attempts: u32,
}

impl TelegramChatClient {
    /// Create a new Telegram chat client.
    #[instrument(name = "TelegramChatClient::new", skip_all)]
    fn new(config: &Config) -> Res<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        info!("Telegram client targeting {}", config.api_base_url);

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            initial_retry_period: config.updates_check_period,
            request_retry_attempts: config.request_retry_attempts,
            response_retry_attempts: config.response_retry_attempts,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn get_updates_once(&self, offset: i64, limit: u32) -> Res<Vec<TelegramUpdate>> {
        let response = self
            .http
            .get(self.method_url(METHOD_GET_UPDATES))
            .query(&[("offset", offset.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| anyhow!("Failed to request updates: {}", e.without_url()))?;

        decode(response).await
    }

    async fn send_message_once(&self, chat_id: i64, text: &str) -> Void {
        let response = self
            .http
            .post(self.method_url(METHOD_SEND_MESSAGE))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send message: {}", e.without_url()))?;

        let _: serde_json::Value = decode(response).await?;

        Ok(())
    }
}

#[async_trait]
impl GenericChatClient for TelegramChatClient {
    #[instrument(skip(self))]
    async fn get_updates(&self, offset: i64, limit: u32) -> Res<Vec<RawMessage>> {
        let updates = with_backoff("getUpdates", self.request_retry_attempts, self.initial_retry_period, || self.get_updates_once(offset, limit)).await?;

        Ok(updates.into_iter().map(RawMessage::from).collect())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, chat_id: i64, text: &str) -> Void {
        with_backoff("sendMessage", self.response_retry_attempts, self.initial_retry_period, || self.send_message_once(chat_id, text)).await
    }
}

// Helpers.

/// Decodes a Bot API response body, whatever its HTTP status.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Res<T> {
    let status = response.status();
    let body: TelegramResponse<T> = response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to decode Telegram response ({status}): {}", e.without_url()))?;

    body.into_result()
}

/// Runs `op` up to `attempts` times, doubling the wait between attempts.
///
/// An attempt count of zero is treated as one.
pub async fn with_backoff<T, F, Fut>(what: &str, attempts: u32, initial_wait: Duration, mut op: F) -> Res<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Res<T>>,
{
    let attempts = attempts.max(1);
    let mut wait = initial_wait;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!("{} failed, retrying in {:?} (attempt {}/{}): {:#}", what, wait, attempt, attempts, err);

                tokio::time::sleep(wait).await;

                wait = wait.saturating_mul(2);
                attempt += 1;
            }
            Err(err) => return Err(err.context(format!("{what} failed after {attempts} attempts"))),
        }
    }
}

// Tests.
