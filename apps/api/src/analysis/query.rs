//! History queries over persisted analyses.

use crate::analysis::store::AnalysisStore;
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRecord, AnalysisSummary};

pub async fn list_analyses(store: &AnalysisStore) -> Result<Vec<AnalysisSummary>, AppError> {
    Ok(store.list_summaries().await?)
}

/// Full record for `id`, or `AppError::NotFound`.
pub async fn get_analysis(store: &AnalysisStore, id: i64) -> Result<AnalysisRecord, AppError> {
    store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))
}
