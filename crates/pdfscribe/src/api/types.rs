//! API request and response types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::config::ServerConfig;
use crate::telegram::Update;

/// Request body limits applied to the router.
///
/// Telegram updates are small JSON documents; files are never uploaded to the
/// webhook, only referenced by `file_id`.
#[derive(Debug, Clone, Copy)]
pub struct ApiSizeLimits {
    pub max_request_body_bytes: usize,
}

impl Default for ApiSizeLimits {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 1024 * 1024,
        }
    }
}

impl ApiSizeLimits {
    pub fn new(max_request_body_bytes: usize) -> Self {
        Self { max_request_body_bytes }
    }
}

impl From<&ServerConfig> for ApiSizeLimits {
    fn from(config: &ServerConfig) -> Self {
        Self::new(config.max_request_body_bytes)
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type name
    pub error_type: String,
    pub message: String,
    pub status_code: u16,
}

/// Shared state of the webhook server.
#[derive(Debug, Clone)]
pub struct ApiState {
    /// Queue feeding the update dispatcher.
    pub updates: mpsc::Sender<Update>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`, if any.
    pub webhook_secret: Option<Arc<str>>,
}

impl ApiState {
    pub fn new(updates: mpsc::Sender<Update>, webhook_secret: Option<String>) -> Self {
        Self {
            updates,
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }
}
