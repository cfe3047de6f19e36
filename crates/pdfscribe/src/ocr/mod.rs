//! OCR subsystem.
//!
//! Scanned PDFs carry no text layer, so their pages are rendered to images
//! and passed through Tesseract. The backend shells out to the `tesseract`
//! binary (with the `rus` and `eng` traineddata installed) rather than
//! linking libtesseract.
//!
//! # Example
//!
//! ```rust,no_run
//! use pdfscribe::ocr::{OcrBackend, TesseractBackend, TesseractConfig};
//!
//! # async fn example() -> Result<(), pdfscribe::ocr::OcrError> {
//! let backend = TesseractBackend::default();
//! let png = std::fs::read("page.png").expect("failed to read image");
//! let text = backend.process_image(&png, &TesseractConfig::default()).await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```
pub mod error;
pub mod tesseract_backend;
pub mod types;
pub mod validation;

pub use error::OcrError;
pub use tesseract_backend::{OcrBackend, TesseractBackend};
pub use types::{PSMMode, TesseractConfig};
pub use validation::validate_language_code;
