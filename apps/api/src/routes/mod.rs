pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::analysis::pipeline::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Headroom for multipart boundaries and part headers on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_handler))
        .route(
            "/api/analyze",
            post(handlers::handle_analyze)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/api/analyses", get(handlers::handle_list_analyses))
        .route("/api/analyses/:id", get(handlers::handle_get_analysis))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analysis::pipeline::tests::{FakeModel, FakeText, MODEL_REPLY};
    use crate::analysis::store::{memory_store, AnalysisStore};

    const BOUNDARY: &str = "X-ANALYZER-TEST-BOUNDARY";

    async fn app_with(reply: &'static str) -> (Router, AnalysisStore) {
        let store = memory_store().await;
        let state = AppState {
            store: store.clone(),
            text_extractor: Arc::new(FakeText(Some("Grace Hopper resume text"))),
            model: Arc::new(FakeModel::replying(reply)),
        };
        (build_router(state), store)
    }

    fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(body: Vec<u8>) -> Request<Body> {
        Request::post("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with(MODEL_REPLY).await;
        let (status, body) = send(app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_analyze_returns_persisted_record() {
        let (app, store) = app_with(MODEL_REPLY).await;
        let body = multipart_body("file", "grace.pdf", "application/pdf", b"%PDF-1.4 fake");

        let (status, body) = send(app, upload(body)).await;
        assert_eq!(status, StatusCode::OK);

        let analysis = &body["analysis"];
        assert_eq!(analysis["name"], "Grace Hopper");
        assert_eq!(analysis["email"], "grace@navy.mil");
        assert_eq!(analysis["rating"], 9.0);
        assert_eq!(analysis["original_filename"], "grace.pdf");
        assert_eq!(analysis["technical_skills"], json!(["COBOL"]));
        assert_eq!(analysis["education"], json!([]));
        assert_eq!(analysis["experience"][0]["company"], "US Navy");
        assert!(analysis["created_at"].is_string());

        let id = analysis["id"].as_i64().unwrap();
        assert!(store.get_by_id(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_pdf() {
        let (app, store) = app_with(MODEL_REPLY).await;
        let body = multipart_body("file", "notes.txt", "text/plain", b"%PDF-1.4 looks like pdf");

        let (status, body) = send(app, upload(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Only PDF files are allowed" }));
        assert!(store.list_summaries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_without_file_field() {
        let (app, _) = app_with(MODEL_REPLY).await;
        let body = multipart_body("document", "cv.pdf", "application/pdf", b"%PDF");

        let (status, body) = send(app, upload(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_analyze_non_multipart_request_has_no_file() {
        let (app, _) = app_with(MODEL_REPLY).await;
        let request = Request::post("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_analyze_rejects_oversized_file() {
        let (app, _) = app_with(MODEL_REPLY).await;
        let data = vec![b'a'; MAX_UPLOAD_BYTES + 1];
        let body = multipart_body("file", "huge.pdf", "application/pdf", &data);

        let (status, body) = send(app, upload(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File too large (max 8MB)");
    }

    #[tokio::test]
    async fn test_analyze_rejects_body_beyond_transport_limit() {
        let (app, _) = app_with(MODEL_REPLY).await;
        let data = vec![b'a'; MAX_UPLOAD_BYTES + 2 * MULTIPART_OVERHEAD_BYTES];
        let body = multipart_body("file", "huge.bin", "application/octet-stream", &data);

        let (status, body) = send(app, upload(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File too large (max 8MB)");
    }

    #[tokio::test]
    async fn test_analyze_unparsable_reply_stores_fallback() {
        let (app, _) = app_with("no json here").await;
        let body = multipart_body("file", "cv.pdf", "application/pdf", b"%PDF");

        let (status, body) = send(app, upload(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["rating"], 0.0);
        assert_eq!(body["analysis"]["improvement_areas"], "No feedback parsed");
        assert_eq!(body["analysis"]["links"], json!([]));
        assert_eq!(body["analysis"]["suggested_skills"], json!([]));
    }

    #[tokio::test]
    async fn test_analyze_extraction_failure_is_generic_500() {
        let store = memory_store().await;
        let app = build_router(AppState {
            store: store.clone(),
            text_extractor: Arc::new(FakeText(None)),
            model: Arc::new(FakeModel::replying(MODEL_REPLY)),
        });
        let body = multipart_body("file", "cv.pdf", "application/pdf", b"%PDF");

        let (status, body) = send(app, upload(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to analyze resume");
        assert!(store.list_summaries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_and_get_analyses() {
        let (app, _) = app_with(MODEL_REPLY).await;
        for name in ["one.pdf", "two.pdf"] {
            let body = multipart_body("file", name, "application/pdf", b"%PDF");
            let (status, _) = send(app.clone(), upload(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(app.clone(), get_request("/api/analyses")).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["original_filename"], "two.pdf");
        assert_eq!(items[1]["original_filename"], "one.pdf");
        assert!(items[0].get("raw_text").is_none());

        let id = items[1]["id"].as_i64().unwrap();
        let (status, body) = send(app, get_request(&format!("/api/analyses/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["original_filename"], "one.pdf");
        assert_eq!(body["analysis"]["soft_skills"], json!(["Leadership"]));
    }

    #[tokio::test]
    async fn test_get_unknown_analysis_is_404() {
        let (app, _) = app_with(MODEL_REPLY).await;
        let (status, body) = send(app.clone(), get_request("/api/analyses/12345")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = send(app, get_request("/api/analyses/not-a-number")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
