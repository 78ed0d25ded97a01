//! Text extraction — converts raw PDF bytes into plain text.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unreadable PDF: {0}")]
    Unreadable(String),

    #[error("PDF extraction task failed: {0}")]
    Task(String),
}

/// PDF → text collaborator. Implement this to swap the PDF backend without
/// touching the pipeline.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns the document text; a document with no text layer yields `""`.
    async fn extract(&self, pdf: Bytes) -> Result<String, ExtractionError>;
}

/// `pdf-extract` backed extractor. Parsing is CPU-bound, so it runs on the
/// blocking pool; a panic inside the PDF library surfaces as `Task`.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, pdf: Bytes) -> Result<String, ExtractionError> {
        let len = pdf.len();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))?
            .map_err(|e| ExtractionError::Unreadable(format!("{e:?}")))?;

        debug!("Extracted {} chars from {} byte PDF", text.len(), len);
        Ok(text)
    }
}
