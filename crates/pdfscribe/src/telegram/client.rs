//! HTTP client for the Telegram Bot API.

use super::types::{ApiResponse, File, Message, ReplyParameters, WebhookInfo};
use crate::core::config::TelegramConfig;
use crate::{Result, ScribeError};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// A text file to send back to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingDocument {
    pub file_name: String,
    pub content: Vec<u8>,
    pub caption: Option<String>,
    pub reply_to_message_id: Option<i64>,
}

/// Bot API calls needed to process a document.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_file(&self, file_id: &str) -> Result<File>;

    /// Download a file by the `file_path` returned from [`BotApi::get_file`].
    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>>;

    async fn send_document(&self, chat_id: i64, document: OutgoingDocument) -> Result<Message>;

    async fn send_message(&self, chat_id: i64, text: &str, reply_to_message_id: Option<i64>) -> Result<Message>;
}

/// `reqwest`-based Bot API client.
///
/// The token is part of every request URL, so transport errors are stripped
/// of their URL before they are wrapped.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    max_download_bytes: u64,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("max_download_bytes", &self.max_download_bytes)
            .finish()
    }
}

impl TelegramClient {
    /// # Errors
    ///
    /// `ScribeError::Validation` when no bot token is configured.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ScribeError::validation("BOT_TOKEN is not set"))?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScribeError::telegram_with_source("Failed to create HTTP client", e.without_url()))?;

        Ok(Self {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            max_download_bytes: config.max_download_bytes,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path.trim_start_matches('/'))
    }

    fn transport_error(method: &str, err: reqwest::Error) -> ScribeError {
        let message = if err.is_timeout() {
            format!("{} timed out", method)
        } else {
            format!("{} request failed", method)
        };
        ScribeError::telegram_with_source(message, err.without_url())
    }

    async fn parse_response<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(method, e))?;

        let parsed: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            ScribeError::telegram_with_source(
                format!("{} returned an unreadable response (HTTP {})", method, status.as_u16()),
                e,
            )
        })?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description,
                error_code,
                parameters,
                ..
            } => {
                let mut message = format!(
                    "{} failed ({}): {}",
                    method,
                    error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                    description.unwrap_or_else(|| "no description".to_string())
                );
                if let Some(retry_after) = parameters.and_then(|p| p.retry_after) {
                    message.push_str(&format!(" (retry after {}s)", retry_after));
                }
                Err(ScribeError::telegram(message))
            }
        }
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Self::transport_error(method, e))?;
        Self::parse_response(method, response).await
    }

    /// Register `url` as the webhook, with an optional secret token.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>, drop_pending_updates: bool) -> Result<bool> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message"],
            "drop_pending_updates": drop_pending_updates,
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }
        self.call("setWebhook", &body).await
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool> {
        self.call(
            "deleteWebhook",
            &json!({ "drop_pending_updates": drop_pending_updates }),
        )
        .await
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        self.call("getWebhookInfo", &json!({})).await
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| Self::transport_error("download", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScribeError::telegram(format!(
                "File download failed with HTTP {}",
                status.as_u16()
            )));
        }

        if let Some(length) = response.content_length()
            && length > self.max_download_bytes
        {
            return Err(ScribeError::validation(format!(
                "File is {} bytes, the limit is {}",
                length, self.max_download_bytes
            )));
        }

        // the declared length may be absent, so the cap is enforced while reading
        let capacity = response.content_length().unwrap_or(0) as usize;
        let mut content = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Self::transport_error("download", e))?;
            if (content.len() + chunk.len()) as u64 > self.max_download_bytes {
                return Err(ScribeError::validation(format!(
                    "File exceeds the limit of {} bytes",
                    self.max_download_bytes
                )));
            }
            content.extend_from_slice(&chunk);
        }
        Ok(content)
    }

    async fn send_document(&self, chat_id: i64, document: OutgoingDocument) -> Result<Message> {
        use reqwest::multipart::{Form, Part};

        let part = Part::bytes(document.content)
            .file_name(document.file_name)
            .mime_str("text/plain; charset=utf-8")
            .map_err(|e| ScribeError::telegram_with_source("Invalid document MIME type", e.without_url()))?;

        let mut form = Form::new().text("chat_id", chat_id.to_string()).part("document", part);
        if let Some(message_id) = document.reply_to_message_id {
            form = form.text("reply_parameters", serde_json::to_string(&ReplyParameters::to(message_id))?);
        }
        if let Some(caption) = document.caption {
            form = form.text("caption", caption);
        }

        let response = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Self::transport_error("sendDocument", e))?;
        Self::parse_response("sendDocument", response).await
    }

    async fn send_message(&self, chat_id: i64, text: &str, reply_to_message_id: Option<i64>) -> Result<Message> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(message_id) = reply_to_message_id {
            body["reply_parameters"] = serde_json::to_value(ReplyParameters::to(message_id))?;
        }
        self.call("sendMessage", &body).await
    }
}
