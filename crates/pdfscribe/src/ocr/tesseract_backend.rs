//! Tesseract OCR backend driven through the `tesseract` command line tool.

use super::error::OcrError;
use super::types::TesseractConfig;
use crate::core::process::{ProcessError, run_with_timeout};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Recognises text in a single page image.
///
/// Backends must be `Send + Sync`; the pipeline OCRs several pages at once.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Backend name, used in logs.
    fn name(&self) -> &str;

    /// Run OCR on an encoded image (PNG from the page renderer).
    async fn process_image(&self, image_bytes: &[u8], config: &TesseractConfig) -> Result<String, OcrError>;

    /// Whether the backend can run on this host.
    async fn is_available(&self) -> bool;
}

/// OCR backend wrapping the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    binary: PathBuf,
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    fn binary_name(&self) -> String {
        self.binary.display().to_string()
    }

    fn build_command(&self, input: &std::path::Path, config: &TesseractConfig) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg(input)
            .arg("stdout")
            .arg("-l")
            .arg(&config.language)
            .arg("--psm")
            .arg(config.psm.as_u8().to_string())
            .arg("--dpi")
            .arg(config.dpi.to_string());

        // OMP_* variables already in our environment are inherited as-is
        if let Some(limit) = config.thread_limit {
            command.env("OMP_THREAD_LIMIT", limit.to_string());
        }
        command
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = %config.language, bytes = image_bytes.len()))]
    async fn process_image(&self, image_bytes: &[u8], config: &TesseractConfig) -> Result<String, OcrError> {
        if image_bytes.is_empty() {
            return Err(OcrError::InvalidConfiguration("empty image data".to_string()));
        }

        let workdir = tempfile::Builder::new()
            .prefix("pdfscribe-ocr")
            .tempdir()
            .map_err(|e| OcrError::IOError(format!("cannot create OCR directory: {}", e)))?;
        let input_path = workdir.path().join("page.png");
        tokio::fs::write(&input_path, image_bytes)
            .await
            .map_err(|e| OcrError::IOError(format!("cannot write OCR input: {}", e)))?;

        let command = self.build_command(&input_path, config);
        let program = self.binary_name();
        let stdout = run_with_timeout(command, &program, config.timeout_secs)
            .await
            .map_err(|e| match e {
                ProcessError::NotFound(binary) => {
                    OcrError::BackendUnavailable(format!("{} not found (install tesseract-ocr)", binary))
                }
                ProcessError::Io(io) => OcrError::IOError(io.to_string()),
                other => OcrError::ProcessingFailed(other.to_string()),
            })?;

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn is_available(&self) -> bool {
        crate::core::process::check_binary(&self.binary_name(), "--version").await
    }
}
