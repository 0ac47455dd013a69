#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PDF handling for fuel bulletins.
//!
//! Bulletins with an embedded text layer are read with pure-Rust text
//! extraction ([`pdf_extract`]) and their tables rebuilt from column-aligned
//! text ([`text_table`]). Scanned bulletins are rendered to images with
//! `pdftoppm` and recognised with `tesseract` ([`ocr`]), which yields words
//! with their positions.

pub mod ocr;
pub mod text_table;

/// Errors specific to PDF handling.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// PDF text extraction failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// A required external program is not installed.
    #[error("Required tool '{tool}' was not found on PATH")]
    ToolMissing {
        /// Program name.
        tool: String,
    },

    /// An external program exited unsuccessfully.
    #[error("{tool} failed: {message}")]
    ToolFailed {
        /// Program name.
        tool: String,
        /// Exit status and trimmed stderr.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts the embedded text layer of a PDF.
///
/// Scanned bulletins have no text layer and yield an empty or
/// whitespace-only string rather than an error.
///
/// # Errors
///
/// Returns [`PdfError::Extraction`] if the PDF cannot be parsed.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| PdfError::Extraction(format!("failed to extract text from PDF: {e}")))?;

    log::debug!("Extracted {} characters of text", text.len());

    Ok(text)
}

/// Returns `true` when the text layer holds no usable characters.
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_an_extraction_error() {
        assert!(matches!(
            extract_text(b"not a pdf"),
            Err(PdfError::Extraction(_))
        ));
    }

    #[test]
    fn blank_text_detection() {
        assert!(is_blank(""));
        assert!(is_blank(" \n\t\u{c}\n"));
        assert!(!is_blank("\nAvtur 210.50"));
    }
}
