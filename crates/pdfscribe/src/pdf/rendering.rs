//! Page rasterisation for OCR.
//!
//! Pages are rendered one at a time with poppler's `pdftoppm`, so memory use
//! stays bounded by the number of pages being OCR'd concurrently rather than
//! by document length.

use super::error::{PdfError, Result};
use crate::core::process::{ProcessError, run_with_timeout};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Default rendering resolution, the one tesseract is tuned for.
pub const DEFAULT_DPI: u32 = 300;

const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;

/// Rasterises a single PDF page into PNG bytes.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renderer name, used in logs.
    fn name(&self) -> &str;

    /// Render `page_number` (1-based) of the PDF at `pdf_path`.
    async fn render_page(&self, pdf_path: &Path, page_number: u32, dpi: u32) -> Result<Vec<u8>>;
}

/// `pdftoppm`-backed renderer.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: PathBuf,
    timeout_secs: u64,
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PdftoppmRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn binary_name(&self) -> String {
        self.binary.display().to_string()
    }

    /// Whether the `pdftoppm` binary can be executed.
    pub async fn is_available(&self) -> bool {
        crate::core::process::check_binary(&self.binary_name(), "-v").await
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn render_page(&self, pdf_path: &Path, page_number: u32, dpi: u32) -> Result<Vec<u8>> {
        if page_number == 0 {
            return Err(PdfError::PageNotFound(0));
        }

        let workdir = tempfile::Builder::new()
            .prefix("pdfscribe-render")
            .tempdir()
            .map_err(|e| PdfError::IOError(format!("cannot create render directory: {}", e)))?;
        let prefix = workdir.path().join("page");

        let mut command = Command::new(&self.binary);
        command
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg("-singlefile")
            .arg(pdf_path)
            .arg(&prefix);

        let program = self.binary_name();
        run_with_timeout(command, &program, self.timeout_secs)
            .await
            .map_err(|e| match e {
                ProcessError::NotFound(binary) => PdfError::MissingRenderer(binary),
                ProcessError::Io(io) => PdfError::IOError(io.to_string()),
                other => PdfError::RenderingFailed(format!("page {}: {}", page_number, other)),
            })?;

        let output_path = prefix.with_extension("png");
        tokio::fs::read(&output_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PdfError::PageNotFound(page_number)
            } else {
                PdfError::IOError(format!("cannot read rendered page {}: {}", page_number, e))
            }
        })
    }
}
