//! Upload pipeline: validate → extract text → AI extraction → flatten → insert → re-fetch.
//!
//! Each upload runs start to finish as one sequential unit. Nothing is
//! written until text extraction and the model call have both completed.

use bytes::Bytes;
use tracing::{info, warn};

use crate::analysis::extractor::extract_analysis;
use crate::analysis::store::AnalysisStore;
use crate::analysis::text::TextExtractor;
use crate::errors::AppError;
use crate::llm_client::GenerativeModel;
use crate::models::analysis::{AnalysisRecord, NewAnalysis};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
/// 8 MiB.
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

pub const MSG_NO_FILE: &str = "No file uploaded";
pub const MSG_UNSUPPORTED_TYPE: &str = "Only PDF files are allowed";
pub const MSG_TOO_LARGE: &str = "File too large (max 8MB)";

/// One uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Checks presence, media type and size, in that order.
pub fn validate_upload(file: Option<&UploadedFile>) -> Result<&UploadedFile, AppError> {
    let file = file.ok_or_else(|| AppError::Validation(MSG_NO_FILE.to_string()))?;

    if !is_pdf_media_type(file.content_type.as_deref()) {
        return Err(AppError::Validation(MSG_UNSUPPORTED_TYPE.to_string()));
    }

    if file.data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(MSG_TOO_LARGE.to_string()));
    }

    Ok(file)
}

/// Compares the media type essence, ignoring parameters and case.
fn is_pdf_media_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
        .unwrap_or(false)
}

/// Runs one upload through the whole pipeline and returns the row exactly
/// as persisted.
pub async fn analyze_upload(
    store: &AnalysisStore,
    text_extractor: &dyn TextExtractor,
    model: &dyn GenerativeModel,
    file: Option<UploadedFile>,
) -> Result<AnalysisRecord, AppError> {
    let file = validate_upload(file.as_ref())?;

    let raw_text = text_extractor.extract(file.data.clone()).await?;

    let extraction = extract_analysis(model, &raw_text)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;
    if extraction.is_fallback() {
        warn!(
            "Stored fallback analysis for '{}' (model reply unusable)",
            file.filename
        );
    }

    let new_row = NewAnalysis::flatten(extraction.into_analysis(), &file.filename, raw_text);
    let id = store.insert(&new_row).await?;

    let record = store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("analysis {id} vanished after insert")))?;

    info!(
        "Stored analysis {} for '{}' ({} bytes)",
        record.id,
        record.original_filename,
        file.data.len()
    );
    Ok(record)
}
