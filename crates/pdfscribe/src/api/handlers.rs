//! API request handlers.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use subtle::ConstantTimeEq;
use tokio::sync::mpsc::error::TrySendError;

use crate::telegram::Update;

use super::{
    error::ApiError,
    types::{ApiState, HealthResponse},
};

/// Header Telegram uses to echo the webhook secret.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Webhook endpoint handler.
///
/// POST /webhook
///
/// The body is parsed as JSON whatever its `Content-Type`. The update is
/// only queued here; processing happens in the dispatcher so Telegram gets
/// its answer immediately. A full queue answers 503 and Telegram redelivers
/// the update later.
pub async fn webhook_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        if !secret_matches(provided, expected) {
            tracing::warn!("Rejected webhook call with a wrong secret token");
            return Err(ApiError::unauthorized("Invalid webhook secret token"));
        }
    }

    let update: Update = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid update payload: {}", e)))?;
    let update_id = update.update_id;

    match state.updates.try_send(update) {
        Ok(()) => {
            tracing::debug!(update_id, "Queued update");
            Ok("OK")
        }
        Err(TrySendError::Full(_)) => {
            tracing::warn!(update_id, "Update queue is full, asking Telegram to retry");
            Err(ApiError::unavailable("Update queue is full"))
        }
        Err(TrySendError::Closed(_)) => Err(ApiError::unavailable("Server is shutting down")),
    }
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn secret_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
