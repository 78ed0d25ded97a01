use std::sync::Arc;

use crate::analysis::store::AnalysisStore;
use crate::analysis::text::TextExtractor;
use crate::llm_client::GenerativeModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: AnalysisStore,
    /// PDF → text collaborator. Default: `PdfTextExtractor`.
    pub text_extractor: Arc<dyn TextExtractor>,
    /// Generative model behind the AI extractor. Default: Gemini `LlmClient`.
    pub model: Arc<dyn GenerativeModel>,
}
