// Résumé analysis: upload validation → PDF text → AI extraction → persistence,
// plus the history queries over persisted analyses.
// All model calls go through llm_client; all SQL lives in store.

pub mod extractor;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod query;
pub mod store;
pub mod text;
