//! pdfscribe - PDF to text Telegram bot
//!
//! Users send a PDF to the bot; the bot extracts its text (falling back to
//! Tesseract OCR for scanned pages), optionally restructures it with an LLM
//! through OpenRouter, and replies with a `.txt` document.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pdfscribe::ScribeConfig;
//!
//! #[tokio::main]
//! async fn main() -> pdfscribe::Result<()> {
//!     let config = ScribeConfig::load(None)?;
//!     pdfscribe::run(config).await
//! }
//! ```
//!
//! # Architecture
//!
//! - **API** (`api`): axum webhook endpoint that queues incoming updates
//! - **Bot** (`bot`): update routing and the bounded worker pool
//! - **Core** (`core`): configuration and the text extraction pipeline
//! - **PDF / OCR** (`pdf`, `ocr`): lopdf text layer, pdftoppm + tesseract for scans
//! - **Structuring** (`structuring`): OpenRouter chat completions with raw-text fallback
//! - **Telegram** (`telegram`): Bot API types and client

#![deny(unsafe_code)]

pub mod api;
pub mod bot;
pub mod core;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod structuring;
pub mod telegram;

pub use core::config::ScribeConfig;
pub use core::pipeline::{ExtractedDocument, ExtractionMethod, PdfTextPipeline};
pub use error::{Result, ScribeError};

use crate::core::config::ExtractionConfig;
use crate::ocr::{OcrBackend, TesseractBackend};
use crate::pdf::PdftoppmRenderer;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Probe the external OCR tools, returning the names of missing ones.
///
/// Nothing is required when OCR is disabled.
pub async fn check_dependencies(config: &ExtractionConfig) -> Vec<String> {
    if !config.ocr.enabled && !config.force_ocr {
        return Vec::new();
    }

    let mut missing = Vec::new();
    if !TesseractBackend::new(&config.ocr.tesseract_path).is_available().await {
        missing.push(config.ocr.tesseract_path.clone());
    }
    if !PdftoppmRenderer::new(&config.ocr.pdftoppm_path).is_available().await {
        missing.push(config.ocr.pdftoppm_path.clone());
    }
    missing
}

/// Run the bot: register the webhook, start the workers and serve HTTP
/// until a shutdown signal arrives.
///
/// # Errors
///
/// Fails on invalid configuration, when the webhook cannot be registered, or
/// when the listener cannot be bound.
pub async fn run(config: ScribeConfig) -> Result<()> {
    config.validate_for_serve()?;

    let client = Arc::new(telegram::TelegramClient::new(&config.telegram)?);

    match &config.telegram.webhook_url {
        Some(url) => {
            client
                .set_webhook(
                    url,
                    config.telegram.webhook_secret.as_deref(),
                    config.telegram.drop_pending_updates,
                )
                .await?;
            tracing::info!(url = %url, "Webhook registered");
        }
        None => tracing::warn!("WEBHOOK_URL is not set, assuming the webhook is registered elsewhere"),
    }

    let missing = check_dependencies(&config.extraction).await;
    if !missing.is_empty() {
        tracing::warn!(
            "OCR tools not found: {}. Scanned PDFs will be answered with their text layer only",
            missing.join(", ")
        );
    }

    let pipeline = PdfTextPipeline::from_config(&config.extraction);
    let structurer = structuring::from_config(&config.structuring)?;
    let handler = Arc::new(bot::UpdateHandler::new(client, pipeline, structurer, &config.telegram));

    let (sender, receiver) = mpsc::channel(config.server.queue_capacity);
    let dispatcher = tokio::spawn(
        bot::UpdateDispatcher::new(handler, config.server.max_concurrent_updates).run(receiver),
    );

    let state = api::ApiState::new(sender, config.telegram.webhook_secret.clone());
    // the router owns the only sender, so the queue closes when serving stops
    let served = api::serve(&config.server, state).await;

    if let Err(e) = dispatcher.await {
        tracing::error!("Update dispatcher panicked: {}", e);
    }
    served
}
