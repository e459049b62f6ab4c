//! Specification text extraction.
//!
//! Pulls page-level text from a PDF byte stream, preserving reading order.
//! The primary path parses the document structure with `lopdf` and extracts
//! text page by page; when the structure cannot be loaded (damaged
//! cross-reference tables and the like), a linear whole-stream pass via
//! `pdf-extract` recovers what it can as a single block. Extraction runs
//! inside `catch_unwind` because malformed fonts can panic deep inside the
//! PDF crates.

use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Prefix searched for the `%PDF-` header.
const HEADER_WINDOW: usize = 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("input is not a PDF byte stream")]
    NotPdf,

    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("document has no extractable text layer")]
    NoTextLayer,
}

/// One page worth of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number; the linear fallback reports everything as
    /// page 1.
    pub page: u32,
    pub text: String,
}

/// Extract page-level text blocks from PDF bytes.
///
/// Pure function over the input; fails only when the bytes are not a PDF or
/// no text layer can be recovered (pure scanned images).
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, ExtractError> {
    if !has_pdf_header(bytes) {
        return Err(ExtractError::NotPdf);
    }

    let pages = match catch_unwind(AssertUnwindSafe(|| structured_pages(bytes))) {
        Ok(Ok(pages)) => pages,
        Ok(Err(error)) => {
            tracing::warn!(%error, "structured parse failed, falling back to linear scan");
            linear_fallback(bytes)?
        }
        Err(_) => {
            tracing::warn!("structured parse panicked, falling back to linear scan");
            linear_fallback(bytes)?
        }
    };

    if pages.iter().all(|p| p.text.trim().is_empty()) {
        return Err(ExtractError::NoTextLayer);
    }

    tracing::debug!(pages = pages.len(), "extracted specification text");
    Ok(pages)
}

/// Page-by-page extraction over the parsed document structure.
fn structured_pages(bytes: &[u8]) -> Result<Vec<PageText>, String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
    if doc.is_encrypted() {
        return Err("document is encrypted".into());
    }

    let mut pages = Vec::new();
    for (page_num, _object_id) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(PageText {
                page: page_num,
                text,
            }),
            Err(error) => {
                // one broken page does not doom the document
                tracing::warn!(page = page_num, %error, "skipping unextractable page");
            }
        }
    }

    if pages.is_empty() {
        return Err("document contains no extractable pages".into());
    }
    Ok(pages)
}

/// Whole-stream pass used when the document structure is damaged.
fn linear_fallback(bytes: &[u8]) -> Result<Vec<PageText>, ExtractError> {
    let text = match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => text,
        Ok(Err(error)) => return Err(ExtractError::Parse(error.to_string())),
        Err(_) => {
            return Err(ExtractError::Parse(
                "extraction panicked, likely malformed fonts".into(),
            ))
        }
    };

    Ok(vec![PageText { page: 1, text }])
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}
