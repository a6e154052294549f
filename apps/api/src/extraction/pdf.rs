use bytes::Bytes;
use tracing::debug;

use super::ExtractionFailure;

/// Document-text path for PDFs, backed by `pdf-extract`.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Extracts text page by page in reading order. Parsing is CPU-bound and
    /// runs on the blocking pool; a parser panic on malformed input is
    /// reported as a corrupt file instead of taking the worker down.
    pub async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionFailure> {
        let joined =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

        match joined {
            Ok(Ok(text)) => {
                let pages = join_pages(&text);
                debug!("PDF text extracted ({} chars)", pages.len());
                Ok(pages)
            }
            Ok(Err(e)) => Err(ExtractionFailure::CorruptFile(e.to_string())),
            Err(e) if e.is_panic() => Err(ExtractionFailure::CorruptFile(
                "PDF parser aborted on malformed input".to_string(),
            )),
            Err(e) => Err(ExtractionFailure::CorruptFile(e.to_string())),
        }
    }
}

/// pdf-extract separates pages with form feeds; concatenate them one page per
/// block, dropping blank pages.
fn join_pages(text: &str) -> String {
    text.split('\u{c}')
        .map(str::trim_end)
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
