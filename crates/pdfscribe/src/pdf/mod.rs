//! PDF handling: text layer extraction and page rasterisation.
//!
//! - [`text`] reads embedded page text with `lopdf`.
//! - [`rendering`] turns pages into PNG images with `pdftoppm` for OCR.
pub mod error;
pub mod rendering;
pub mod text;

pub use error::PdfError;
pub use rendering::{PageRenderer, PdftoppmRenderer};
pub use text::{extract_pages, has_pdf_header, join_pages, page_count};
