//! PDF text pipeline: native text layer first, OCR when the layer is unusable.

use crate::core::config::ExtractionConfig;
use crate::ocr::{OcrBackend, TesseractBackend, TesseractConfig};
use crate::pdf::{PageRenderer, PdftoppmRenderer};
use crate::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

const MIN_TOTAL_NON_WHITESPACE: usize = 64;
const MIN_NON_WHITESPACE_PER_PAGE: f64 = 32.0;
const MIN_MEANINGFUL_WORD_LEN: usize = 4;
const MIN_MEANINGFUL_WORDS: usize = 3;
const MIN_ALNUM_RATIO: f64 = 0.3;

/// How the text of a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Native,
    Ocr,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Native => write!(f, "native"),
            ExtractionMethod::Ocr => write!(f, "ocr"),
        }
    }
}

/// Text extracted from one PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Page texts joined in page order, each followed by a newline.
    pub content: String,
    pub page_count: usize,
    pub method: ExtractionMethod,
}

impl ExtractedDocument {
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeTextStats {
    pub non_whitespace: usize,
    pub alnum: usize,
    pub meaningful_words: usize,
    pub alnum_ratio: f64,
}

impl NativeTextStats {
    fn from_text(text: &str) -> Self {
        let mut non_whitespace = 0usize;
        let mut alnum = 0usize;

        for ch in text.chars() {
            if !ch.is_whitespace() {
                non_whitespace += 1;
                if ch.is_alphanumeric() {
                    alnum += 1;
                }
            }
        }

        let meaningful_words = text
            .split_whitespace()
            .filter(|word| {
                word.chars()
                    .filter(|c| c.is_alphanumeric())
                    .take(MIN_MEANINGFUL_WORD_LEN)
                    .count()
                    >= MIN_MEANINGFUL_WORD_LEN
            })
            .take(MIN_MEANINGFUL_WORDS)
            .count();

        let alnum_ratio = if non_whitespace == 0 {
            0.0
        } else {
            alnum as f64 / non_whitespace as f64
        };

        Self {
            non_whitespace,
            alnum,
            meaningful_words,
            alnum_ratio,
        }
    }
}

/// Outcome of [`evaluate_native_text_for_ocr`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrFallbackDecision {
    pub stats: NativeTextStats,
    pub avg_non_whitespace: f64,
    pub avg_alnum: f64,
    pub fallback: bool,
}

/// Decide whether a PDF's text layer is too thin to trust.
///
/// Scanned documents typically have no text layer at all, or only a few
/// stray glyphs from stamps and page numbers. Text is kept when it has at
/// least 64 non-whitespace characters, 32 per page on average, and a few
/// real words.
pub fn evaluate_native_text_for_ocr(native_text: &str, page_count: Option<usize>) -> OcrFallbackDecision {
    let trimmed = native_text.trim();

    if trimmed.is_empty() {
        return OcrFallbackDecision {
            stats: NativeTextStats {
                non_whitespace: 0,
                alnum: 0,
                meaningful_words: 0,
                alnum_ratio: 0.0,
            },
            avg_non_whitespace: 0.0,
            avg_alnum: 0.0,
            fallback: true,
        };
    }

    let stats = NativeTextStats::from_text(trimmed);
    let pages = page_count.unwrap_or(1).max(1) as f64;
    let avg_non_whitespace = stats.non_whitespace as f64 / pages;
    let avg_alnum = stats.alnum as f64 / pages;

    let has_substantial_text = stats.non_whitespace >= MIN_TOTAL_NON_WHITESPACE
        && avg_non_whitespace >= MIN_NON_WHITESPACE_PER_PAGE
        && stats.meaningful_words >= MIN_MEANINGFUL_WORDS;

    let fallback = if stats.non_whitespace == 0 || stats.alnum == 0 {
        true
    } else if has_substantial_text {
        false
    } else if (stats.alnum_ratio < MIN_ALNUM_RATIO && avg_alnum < MIN_NON_WHITESPACE_PER_PAGE)
        || (stats.non_whitespace < MIN_TOTAL_NON_WHITESPACE && avg_non_whitespace < MIN_NON_WHITESPACE_PER_PAGE)
    {
        true
    } else {
        stats.meaningful_words == 0 && avg_non_whitespace < MIN_NON_WHITESPACE_PER_PAGE
    };

    OcrFallbackDecision {
        stats,
        avg_non_whitespace,
        avg_alnum,
        fallback,
    }
}

/// Extracts text from PDF bytes.
///
/// Cheap to clone; renderer and OCR backend are shared.
#[derive(Clone)]
pub struct PdfTextPipeline {
    renderer: Arc<dyn PageRenderer>,
    ocr: Arc<dyn OcrBackend>,
    config: ExtractionConfig,
}

impl std::fmt::Debug for PdfTextPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfTextPipeline")
            .field("renderer", &self.renderer.name())
            .field("ocr", &self.ocr.name())
            .field("config", &self.config)
            .finish()
    }
}

impl PdfTextPipeline {
    pub fn new(renderer: Arc<dyn PageRenderer>, ocr: Arc<dyn OcrBackend>, config: ExtractionConfig) -> Self {
        Self { renderer, ocr, config }
    }

    /// Pipeline backed by `pdftoppm` and `tesseract` from the configured paths.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let renderer = PdftoppmRenderer::new(&config.ocr.pdftoppm_path).with_timeout(config.ocr.timeout_secs);
        let ocr = TesseractBackend::new(&config.ocr.tesseract_path);
        Self::new(Arc::new(renderer), Arc::new(ocr), config.clone())
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the text of a PDF.
    ///
    /// # Errors
    ///
    /// - `ScribeError::Parsing` for bytes that are not a readable PDF
    /// - `ScribeError::Validation` when the document has more than `max_pages` pages
    /// - `ScribeError::MissingDependency` when OCR is forced and a binary is missing
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = bytes.len()))]
    pub async fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        if !crate::pdf::has_pdf_header(bytes) {
            return Err(ScribeError::parsing("File is not a PDF document"));
        }

        let owned = bytes.to_vec();
        let pages = tokio::task::spawn_blocking(move || crate::pdf::extract_pages(&owned))
            .await
            .map_err(|e| ScribeError::Other(format!("Text extraction task failed: {}", e)))??;

        let page_count = pages.len();
        if page_count > self.config.max_pages {
            return Err(ScribeError::validation(format!(
                "Document has {} pages, the limit is {}",
                page_count, self.config.max_pages
            )));
        }

        let native_text = crate::pdf::join_pages(&pages);
        let native = ExtractedDocument {
            content: native_text,
            page_count,
            method: ExtractionMethod::Native,
        };

        let force = self.config.force_ocr;
        if !force {
            if !self.config.ocr.enabled {
                return Ok(native);
            }
            let decision = evaluate_native_text_for_ocr(&native.content, Some(page_count));
            tracing::debug!(
                non_whitespace = decision.stats.non_whitespace,
                meaningful_words = decision.stats.meaningful_words,
                avg_non_whitespace = decision.avg_non_whitespace,
                fallback = decision.fallback,
                "Evaluated native text layer"
            );
            if !decision.fallback {
                return Ok(native);
            }
        }

        match self.ocr_document(bytes, page_count).await {
            Ok(content) => Ok(ExtractedDocument {
                content,
                page_count,
                method: ExtractionMethod::Ocr,
            }),
            Err(e) if force || matches!(e, ScribeError::Io(_)) => Err(e),
            Err(ScribeError::MissingDependency(binary)) => {
                tracing::warn!("OCR unavailable ({}), returning native text", binary);
                Ok(native)
            }
            Err(e) if !native.is_blank() => {
                tracing::warn!("OCR failed ({}), returning native text", e);
                Ok(native)
            }
            Err(e) => Err(e),
        }
    }

    async fn ocr_document(&self, bytes: &[u8], page_count: usize) -> Result<String> {
        use tokio::sync::Semaphore;
        use tokio::task::JoinSet;

        let tesseract_config = TesseractConfig::from(&self.config.ocr);
        tesseract_config.validate()?;

        let workdir = tempfile::Builder::new().prefix("pdfscribe-pdf").tempdir()?;
        let pdf_path: PathBuf = workdir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, bytes).await?;

        tracing::info!(
            pages = page_count,
            renderer = self.renderer.name(),
            backend = self.ocr.name(),
            "Running OCR"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.ocr.max_concurrent_pages.max(1)));
        let tesseract_config = Arc::new(tesseract_config);
        let dpi = self.config.ocr.dpi;
        let mut tasks = JoinSet::new();

        for index in 0..page_count {
            let renderer = Arc::clone(&self.renderer);
            let ocr = Arc::clone(&self.ocr);
            let semaphore = Arc::clone(&semaphore);
            let tesseract_config = Arc::clone(&tesseract_config);
            let pdf_path = pdf_path.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| ScribeError::Other(format!("OCR semaphore closed: {}", e)))?;
                let page_number = index as u32 + 1;
                let image = renderer.render_page(&pdf_path, page_number, dpi).await?;
                let text = ocr.process_image(&image, &tesseract_config).await?;
                Ok::<_, ScribeError>((index, text))
            });
        }

        let mut results: Vec<Option<String>> = vec![None; page_count];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, text))) => results[index] = Some(text.trim().to_string()),
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    tasks.abort_all();
                    return Err(ScribeError::Other(format!("OCR task panicked: {}", join_err)));
                }
            }
        }

        let pages: Vec<String> = results.into_iter().map(Option::unwrap_or_default).collect();
        Ok(crate::pdf::join_pages(&pages))
    }
}
