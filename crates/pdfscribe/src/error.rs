//! Error types for pdfscribe.
//!
//! Every fallible operation in the library returns [`ScribeError`]. The rules
//! mirror how the service reports failures:
//!
//! - `ScribeError::Io` (from `std::io::Error`) bubbles up unchanged. It means
//!   the host is broken (disk, permissions, sockets) rather than the document.
//! - Document and remote-service failures are wrapped with context:
//!   `Parsing` for unreadable PDFs, `Ocr` for tesseract failures, `Telegram`
//!   for Bot API errors, `Structuring` for LLM failures.
//! - `MissingDependency` names an external binary (`tesseract`, `pdftoppm`)
//!   that is not installed.
//!
//! # Example
//!
//! ```rust
//! use pdfscribe::{Result, ScribeError};
//!
//! fn require_token(token: Option<&str>) -> Result<&str> {
//!     token.ok_or_else(|| ScribeError::validation("BOT_TOKEN is not set"))
//! }
//!
//! assert!(require_token(None).is_err());
//! ```
use thiserror::Error;

/// Result type alias using `ScribeError`.
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Main error type for all pdfscribe operations.
#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Telegram API error: {message}")]
    Telegram {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Structuring error: {message}")]
    Structuring {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        ScribeError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<crate::pdf::error::PdfError> for ScribeError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        match err {
            crate::pdf::error::PdfError::MissingRenderer(binary) => ScribeError::MissingDependency(binary),
            crate::pdf::error::PdfError::IOError(msg) => ScribeError::Io(std::io::Error::other(msg)),
            other => ScribeError::Parsing {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<crate::ocr::error::OcrError> for ScribeError {
    fn from(err: crate::ocr::error::OcrError) -> Self {
        match err {
            crate::ocr::error::OcrError::BackendUnavailable(msg) => ScribeError::MissingDependency(msg),
            other => ScribeError::Ocr {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl ScribeError {
    error_constructor!(parsing, Parsing);
    error_constructor!(ocr, Ocr);
    error_constructor!(validation, Validation);
    error_constructor!(telegram, Telegram);
    error_constructor!(structuring, Structuring);
    error_constructor!(serialization, Serialization);

    /// Short, stable name of the variant, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScribeError::Io(_) => "io",
            ScribeError::Parsing { .. } => "parsing",
            ScribeError::Ocr { .. } => "ocr",
            ScribeError::Validation { .. } => "validation",
            ScribeError::Telegram { .. } => "telegram",
            ScribeError::Structuring { .. } => "structuring",
            ScribeError::Serialization { .. } => "serialization",
            ScribeError::MissingDependency(_) => "missing_dependency",
            ScribeError::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::error::OcrError;
    use crate::pdf::error::PdfError;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScribeError = io_err.into();
        assert!(matches!(err, ScribeError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_parsing_error() {
        let err = ScribeError::parsing("invalid format");
        assert_eq!(err.to_string(), "Parsing error: invalid format");
    }

    #[test]
    fn test_parsing_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = ScribeError::parsing_with_source("invalid format", source);
        assert_eq!(err.to_string(), "Parsing error: invalid format");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_telegram_error() {
        let err = ScribeError::telegram("Bad Request: chat not found");
        assert_eq!(err.to_string(), "Telegram API error: Bad Request: chat not found");
        assert_eq!(err.kind(), "telegram");
    }

    #[test]
    fn test_structuring_error_with_source() {
        let source = std::io::Error::other("connection reset");
        let err = ScribeError::structuring_with_source("OpenRouter request failed", source);
        assert_eq!(err.to_string(), "Structuring error: OpenRouter request failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_error() {
        let err = ScribeError::validation("invalid input");
        assert_eq!(err.to_string(), "Validation error: invalid input");
    }

    #[test]
    fn test_missing_dependency_error() {
        let err = ScribeError::MissingDependency("tesseract not found".to_string());
        assert_eq!(err.to_string(), "Missing dependency: tesseract not found");
        assert_eq!(err.kind(), "missing_dependency");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ScribeError = json_err.into();
        assert!(matches!(err, ScribeError::Serialization { .. }));
    }

    #[test]
    fn test_pdf_error_conversion() {
        let err: ScribeError = PdfError::InvalidPdf("corrupt header".to_string()).into();
        assert!(matches!(err, ScribeError::Parsing { .. }));
        assert!(err.to_string().contains("corrupt header"));
    }

    #[test]
    fn test_pdf_io_error_stays_io() {
        let err: ScribeError = PdfError::IOError("cannot create render directory: disk full".to_string()).into();
        assert!(matches!(err, ScribeError::Io(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_missing_renderer_becomes_missing_dependency() {
        let err: ScribeError = PdfError::MissingRenderer("pdftoppm".to_string()).into();
        assert!(matches!(err, ScribeError::MissingDependency(_)));
    }

    #[test]
    fn test_ocr_error_conversion() {
        let err: ScribeError = OcrError::ProcessingFailed("exit status 1".to_string()).into();
        assert!(matches!(err, ScribeError::Ocr { .. }));

        let err: ScribeError = OcrError::BackendUnavailable("tesseract".to_string()).into();
        assert!(matches!(err, ScribeError::MissingDependency(_)));
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<String> {
            let content = std::fs::read_to_string("/nonexistent/file.txt")?;
            Ok(content)
        }

        assert!(matches!(read_file().unwrap_err(), ScribeError::Io(_)));
    }
}
