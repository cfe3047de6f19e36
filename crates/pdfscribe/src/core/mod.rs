//! Configuration, the extraction pipeline and subprocess helpers.

pub mod config;
pub mod pipeline;
pub mod process;

pub use config::ScribeConfig;
pub use pipeline::{ExtractedDocument, ExtractionMethod, PdfTextPipeline};
