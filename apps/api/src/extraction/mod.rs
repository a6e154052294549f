//! Text extraction: turns one uploaded file into plain text.
//!
//! PDFs go through the document-text path, images through OCR. Every failure
//! is scoped to the file that caused it; callers decide what to do with it.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;
use crate::models::analysis::FailureReason;
use crate::models::upload::{MediaType, UploadedFile};

pub mod ocr;
pub mod pdf;

use ocr::TesseractOcr;
use pdf::PdfTextExtractor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Length of `text` in characters.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("unsupported media type for '{0}'")]
    UnsupportedType(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("corrupt or unreadable file: {0}")]
    CorruptFile(String),

    #[error("no text could be extracted")]
    Empty,

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

impl ExtractionFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            ExtractionFailure::UnsupportedType(_) => FailureReason::UnsupportedType,
            ExtractionFailure::OcrError(_) => FailureReason::OcrError,
            ExtractionFailure::CorruptFile(_) => FailureReason::CorruptFile,
            ExtractionFailure::Empty => FailureReason::Empty,
            ExtractionFailure::TooLarge { .. } => FailureReason::TooLarge,
        }
    }
}

pub type ExtractionResult = Result<ExtractedText, ExtractionFailure>;

/// The extraction capability the pipeline depends on.
///
/// Carried as `Arc<dyn TextExtractor>` so tests can substitute a fake.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, file: &UploadedFile) -> ExtractionResult;

    /// Readiness check used by `/health`.
    async fn probe(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Production extractor: dispatches on media type to pdf-extract or tesseract.
pub struct DocumentTextExtractor {
    pdf: PdfTextExtractor,
    ocr: TesseractOcr,
    max_file_size_bytes: usize,
}

impl DocumentTextExtractor {
    pub fn new(ocr: TesseractOcr, max_file_size_bytes: usize) -> Self {
        Self {
            pdf: PdfTextExtractor,
            ocr,
            max_file_size_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let ocr = TesseractOcr::new(
            &config.tesseract_path,
            &config.ocr_languages,
            Duration::from_secs(config.ocr_timeout_secs),
        );
        Self::new(ocr, config.max_file_size_bytes)
    }
}

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract(&self, file: &UploadedFile) -> ExtractionResult {
        if file.media_type == MediaType::Unsupported {
            return Err(ExtractionFailure::UnsupportedType(file.name.clone()));
        }
        if file.bytes.len() > self.max_file_size_bytes {
            return Err(ExtractionFailure::TooLarge {
                size: file.bytes.len(),
                limit: self.max_file_size_bytes,
            });
        }
        if file.bytes.is_empty() {
            return Err(ExtractionFailure::CorruptFile("empty payload".to_string()));
        }

        let raw = match file.media_type {
            MediaType::Pdf => self.pdf.extract(file.bytes.clone()).await?,
            media_type if media_type.is_image() => {
                self.ocr.recognize(&file.bytes, media_type).await?
            }
            _ => return Err(ExtractionFailure::UnsupportedType(file.name.clone())),
        };

        finalize_text(&raw)
    }

    async fn probe(&self) -> Result<(), String> {
        self.ocr.version().await.map(|_| ())
    }
}

/// Trims extractor output and rejects whitespace-only text, so downstream
/// summarization never sees empty input.
pub fn finalize_text(raw: &str) -> ExtractionResult {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ExtractionFailure::Empty);
    }
    Ok(ExtractedText {
        text: text.to_string(),
        length: text.chars().count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor_with_missing_ocr(limit: usize) -> DocumentTextExtractor {
        let ocr = TesseractOcr::new(
            "/nonexistent/tesseract-binary",
            "por+eng",
            Duration::from_secs(5),
        );
        DocumentTextExtractor::new(ocr, limit)
    }

    #[test]
    fn test_whitespace_only_text_is_empty_failure() {
        assert_eq!(finalize_text("  \n\t \u{c} "), Err(ExtractionFailure::Empty));
    }

    #[test]
    fn test_finalize_counts_characters_not_bytes() {
        let extracted = finalize_text("  Experiência sênior \n").unwrap();
        assert_eq!(extracted.text, "Experiência sênior");
        assert_eq!(extracted.length, 18);
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_without_touching_tools() {
        let extractor = extractor_with_missing_ocr(1024);
        let file = UploadedFile::new("cv.docx", MediaType::Unsupported, b"PK\x03\x04".to_vec());
        let result = extractor.extract(&file).await;
        assert_eq!(
            result,
            Err(ExtractionFailure::UnsupportedType("cv.docx".to_string()))
        );
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected_before_extraction() {
        let extractor = extractor_with_missing_ocr(4);
        let file = UploadedFile::new("cv.png", MediaType::Png, vec![0u8; 5]);
        let failure = extractor.extract(&file).await.unwrap_err();
        assert_eq!(failure.reason(), FailureReason::TooLarge);
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_corrupt() {
        let extractor = extractor_with_missing_ocr(1024);
        let file = UploadedFile::new("broken.pdf", MediaType::Pdf, b"definitely not a pdf".to_vec());
        let failure = extractor.extract(&file).await.unwrap_err();
        assert_eq!(failure.reason(), FailureReason::CorruptFile);
    }

    #[tokio::test]
    async fn test_missing_ocr_binary_is_ocr_error() {
        let extractor = extractor_with_missing_ocr(1024);
        let file = UploadedFile::new("scan.png", MediaType::Png, b"\x89PNG\r\n\x1a\n".to_vec());
        let failure = extractor.extract(&file).await.unwrap_err();
        assert_eq!(failure.reason(), FailureReason::OcrError);
    }

    #[tokio::test]
    async fn test_probe_reports_missing_ocr_binary() {
        let extractor = extractor_with_missing_ocr(1024);
        assert!(extractor.probe().await.is_err());
    }
}
