//! PDF text extraction with page accounting.
//!
//! Extraction never fails past this boundary: any parse error comes back as
//! `success = false` with the message attached, so callers can uniformly
//! skip failed extractions and keep the pipeline moving.

use lopdf::Document;
use tracing::debug;

/// Result of extracting text from PDF bytes.
#[derive(Debug, Clone)]
pub struct PdfExtraction {
    /// Per-page text joined with blank lines, page order preserved
    pub text: String,
    pub page_count: usize,
    pub file_size_bytes: usize,
    pub success: bool,
    pub error: Option<String>,
}

impl PdfExtraction {
    fn failure(size: usize, message: String) -> Self {
        Self {
            text: String::new(),
            page_count: 0,
            file_size_bytes: size,
            success: false,
            error: Some(message),
        }
    }
}

/// Extract plain text from PDF bytes.
pub fn extract_text(pdf_bytes: &[u8]) -> PdfExtraction {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(doc) => doc,
        Err(e) => return PdfExtraction::failure(pdf_bytes.len(), e.to_string()),
    };

    let pages = doc.get_pages();
    let page_count = pages.len();

    let mut parts: Vec<String> = Vec::with_capacity(page_count);
    for &page_number in pages.keys() {
        // Pages that fail individually (damaged streams, unsupported
        // encodings) are skipped; the rest of the document still extracts.
        match doc.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => parts.push(text),
            Ok(_) => {}
            Err(e) => {
                debug!(page = page_number, error = %e, "page extraction failed");
            }
        }
    }

    let full_text = parts.join("\n\n");
    debug!(
        chars = full_text.len(),
        pages = page_count,
        "extracted text from PDF"
    );

    PdfExtraction {
        text: full_text,
        page_count,
        file_size_bytes: pdf_bytes.len(),
        success: true,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_fail_cleanly() {
        // 1KB of bytes that are definitely not a PDF
        let junk: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();

        let result = extract_text(&junk);

        assert!(!result.success);
        assert!(result.text.is_empty());
        assert!(result.error.as_deref().is_some_and(|e| !e.is_empty()));
        assert_eq!(result.file_size_bytes, 1024);
        assert_eq!(result.page_count, 0);
    }

    #[test]
    fn test_empty_input_fails_cleanly() {
        let result = extract_text(&[]);
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
