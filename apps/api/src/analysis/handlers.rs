//! Axum route handlers for the Analysis API.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::analysis::pipeline::{analyze_upload, UploadedFile, MSG_NO_FILE, MSG_TOO_LARGE};
use crate::analysis::query::{get_analysis, list_analyses};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRecord, AnalysisSummary};
use crate::state::AppState;

/// Multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: AnalysisRecord,
}

#[derive(Debug, Serialize)]
pub struct AnalysisListResponse {
    pub items: Vec<AnalysisSummary>,
}

/// POST /api/analyze
///
/// Multipart upload with a `file` field (PDF, ≤ 8 MiB). Returns the stored analysis.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    // A request that is not multipart at all carries no file.
    let file = match multipart {
        Ok(mut multipart) => read_file_field(&mut multipart).await?,
        Err(rejection) => {
            warn!("Analyze request is not multipart: {rejection}");
            return Err(AppError::Validation(MSG_NO_FILE.to_string()));
        }
    };

    let analysis = analyze_upload(
        &state.store,
        state.text_extractor.as_ref(),
        state.model.as_ref(),
        file,
    )
    .await?;

    Ok(Json(AnalysisResponse { analysis }))
}

/// GET /api/analyses
///
/// All stored analyses, newest first.
pub async fn handle_list_analyses(
    State(state): State<AppState>,
) -> Result<Json<AnalysisListResponse>, AppError> {
    let items = list_analyses(&state.store).await?;
    Ok(Json(AnalysisListResponse { items }))
}

/// GET /api/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    // Ids are integers; anything else cannot name a stored analysis.
    let Path(id) = id.map_err(|_| AppError::NotFound("Analysis not found".to_string()))?;
    let analysis = get_analysis(&state.store, id).await?;
    Ok(Json(AnalysisResponse { analysis }))
}

/// Returns the first `file` field; other fields are skipped.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(String::from);
        let data = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some(UploadedFile {
            filename,
            content_type,
            data,
        }));
    }

    Ok(None)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::Validation(MSG_TOO_LARGE.to_string());
    }
    warn!("Malformed multipart upload: {err}");
    AppError::Validation("Malformed upload".to_string())
}
