//! Per-update bot logic.

use crate::core::config::TelegramConfig;
use crate::core::pipeline::{ExtractionMethod, PdfTextPipeline};
use crate::structuring::{TextStructurer, structure_with_fallback};
use crate::telegram::{BotApi, Document, Message, OutgoingDocument, Update};
use crate::{Result, ScribeError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Name used when the incoming document has no usable file name.
pub const DEFAULT_OUTPUT_NAME: &str = "output.txt";

pub(crate) mod replies {
    pub const USAGE: &str = "Отправьте мне PDF-файл, и я пришлю его текст в виде .txt документа.\n\
        Сканы распознаются через OCR (русский и английский).\n\n\
        Send me a PDF and I will reply with its text as a .txt file.";
    pub const NO_TEXT: &str = "В документе не найден текст. / No text was found in this document.";
    pub const UNREADABLE: &str = "Не удалось прочитать PDF. Возможно, файл повреждён или защищён паролем. \
        / The PDF could not be read; it may be damaged or password protected.";
    pub const FAILED: &str =
        "Не удалось обработать документ, попробуйте позже. / The document could not be processed, please try again later.";

    pub fn too_large(limit_bytes: u64) -> String {
        let limit_mb = limit_bytes / (1024 * 1024);
        format!(
            "Файл слишком большой, максимум {} МБ. / The file is too large, the limit is {} MB.",
            limit_mb, limit_mb
        )
    }

    pub fn rejected(reason: &str) -> String {
        format!("Документ не обработан: {} / The document was not processed: {}", reason, reason)
    }
}

/// What happened to an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Not something the bot reacts to.
    Ignored,
    /// Answered with a text message.
    Replied,
    /// Extracted text sent back as a document.
    DocumentSent {
        file_name: String,
        structured: bool,
        method: ExtractionMethod,
    },
    /// Refused before download (too large).
    Rejected,
}

/// Processes one update end to end.
#[async_trait]
pub trait UpdateProcessor: Send + Sync {
    async fn process(&self, update: Update) -> Result<HandleOutcome>;
}

/// Turns PDF messages into `.txt` replies.
pub struct UpdateHandler {
    api: Arc<dyn BotApi>,
    pipeline: PdfTextPipeline,
    structurer: Arc<dyn TextStructurer>,
    max_download_bytes: u64,
}

impl UpdateHandler {
    pub fn new(
        api: Arc<dyn BotApi>,
        pipeline: PdfTextPipeline,
        structurer: Arc<dyn TextStructurer>,
        config: &TelegramConfig,
    ) -> Self {
        Self {
            api,
            pipeline,
            structurer,
            max_download_bytes: config.max_download_bytes,
        }
    }

    /// Route an update.
    ///
    /// Errors are reported to the chat before being returned, so the caller
    /// only needs to log them.
    #[tracing::instrument(
        skip_all,
        fields(
            update_id = update.update_id,
            chat_id = tracing::field::Empty,
        )
    )]
    pub async fn handle_update(&self, update: Update) -> Result<HandleOutcome> {
        let Some(message) = update.message else {
            tracing::debug!("Ignoring update without a message");
            return Ok(HandleOutcome::Ignored);
        };
        tracing::Span::current().record("chat_id", message.chat.id);

        if let Some(command) = message.command()
            && matches!(command, "start" | "help")
        {
            self.api
                .send_message(message.chat.id, replies::USAGE, Some(message.message_id))
                .await?;
            return Ok(HandleOutcome::Replied);
        }

        match &message.document {
            Some(document) if document.is_pdf() => self.handle_pdf(&message, document).await,
            Some(document) => {
                tracing::debug!(mime_type = ?document.mime_type, "Ignoring non-PDF document");
                Ok(HandleOutcome::Ignored)
            }
            None => {
                tracing::debug!("Ignoring message without a document");
                Ok(HandleOutcome::Ignored)
            }
        }
    }

    async fn handle_pdf(&self, message: &Message, document: &Document) -> Result<HandleOutcome> {
        let chat_id = message.chat.id;

        if let Some(size) = document.file_size
            && size > self.max_download_bytes
        {
            tracing::info!(size, limit = self.max_download_bytes, "Rejecting oversized document");
            self.report(chat_id, message.message_id, &replies::too_large(self.max_download_bytes))
                .await;
            return Ok(HandleOutcome::Rejected);
        }

        match self.convert(message, document).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let reply = match &e {
                    ScribeError::Parsing { .. } => replies::UNREADABLE.to_string(),
                    ScribeError::Validation { message, .. } => replies::rejected(message),
                    _ => replies::FAILED.to_string(),
                };
                self.report(chat_id, message.message_id, &reply).await;
                Err(e)
            }
        }
    }

    async fn convert(&self, message: &Message, document: &Document) -> Result<HandleOutcome> {
        let chat_id = message.chat.id;

        let file = self.api.get_file(&document.file_id).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| ScribeError::telegram("getFile returned no file_path"))?;
        let bytes = self.api.download_file(&file_path).await?;
        tracing::info!(bytes = bytes.len(), file_name = ?document.file_name, "Downloaded document");

        let extracted = self.pipeline.extract(&bytes).await?;
        if extracted.is_blank() {
            tracing::info!(pages = extracted.page_count, "No text found in document");
            self.api
                .send_message(chat_id, replies::NO_TEXT, Some(message.message_id))
                .await?;
            return Ok(HandleOutcome::Replied);
        }

        let result = structure_with_fallback(self.structurer.as_ref(), &extracted.content).await;
        let file_name = output_file_name(document.file_name.as_deref());

        self.api
            .send_document(
                chat_id,
                OutgoingDocument {
                    file_name: file_name.clone(),
                    content: result.text.into_bytes(),
                    caption: None,
                    reply_to_message_id: Some(message.message_id),
                },
            )
            .await?;

        tracing::info!(
            pages = extracted.page_count,
            method = %extracted.method,
            structured = result.structured,
            %file_name,
            "Sent extracted text"
        );

        Ok(HandleOutcome::DocumentSent {
            file_name,
            structured: result.structured,
            method: extracted.method,
        })
    }

    async fn report(&self, chat_id: i64, reply_to: i64, text: &str) {
        if let Err(e) = self.api.send_message(chat_id, text, Some(reply_to)).await {
            tracing::warn!("Failed to notify chat {}: {}", chat_id, e);
        }
    }
}

#[async_trait]
impl UpdateProcessor for UpdateHandler {
    async fn process(&self, update: Update) -> Result<HandleOutcome> {
        self.handle_update(update).await
    }
}

/// `report.pdf` becomes `report.txt`; anything without a stem becomes `output.txt`.
pub fn output_file_name(source: Option<&str>) -> String {
    source
        .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name))
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty() && *stem != "." && *stem != "..")
        .map(|stem| format!("{}.txt", stem))
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string())
}
