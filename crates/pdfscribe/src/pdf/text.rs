//! PDF text layer extraction.
//!
//! Reads the embedded text of each page with `lopdf`. Scanned documents have
//! no text layer; the pipeline decides from the returned text whether OCR is
//! needed.

use super::error::{PdfError, Result};
use lopdf::Document;

/// Number of leading bytes searched for the `%PDF-` header.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Check whether the buffer looks like a PDF file.
///
/// The header is allowed to appear after some leading garbage, as many
/// readers tolerate it.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Parse a PDF document from memory.
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    if !has_pdf_header(bytes) {
        return Err(PdfError::InvalidPdf("missing %PDF header".to_string()));
    }

    let document = Document::load_mem(bytes).map_err(|e| {
        let err_msg = e.to_string().to_lowercase();
        if err_msg.contains("password") || err_msg.contains("decrypt") || err_msg.contains("encrypt") {
            PdfError::PasswordRequired
        } else {
            PdfError::from(e)
        }
    })?;

    // lopdf already decrypts documents whose user password is empty
    if document.is_encrypted() && document.authenticate_password("").is_err() {
        return Err(PdfError::PasswordRequired);
    }

    Ok(document)
}

/// Number of pages in the document.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let document = load_document(bytes)?;
    Ok(document.get_pages().len())
}

/// Extract the text of every page, in page order.
///
/// A page whose content stream cannot be decoded contributes an empty
/// string instead of failing the whole document.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let document = load_document(bytes)?;
    extract_pages_from_document(&document)
}

pub fn extract_pages_from_document(document: &Document) -> Result<Vec<String>> {
    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(PdfError::EmptyDocument);
    }

    let mut texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                tracing::debug!(page = *page_number, error = %e, "page text could not be decoded");
                texts.push(String::new());
            }
        }
    }

    Ok(texts)
}

/// Join page texts into one document, each page terminated by a newline.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let capacity = pages.iter().map(|p| p.as_ref().len() + 1).sum();
    let mut joined = String::with_capacity(capacity);
    for page in pages {
        joined.push_str(page.as_ref());
        joined.push('\n');
    }
    joined
}
