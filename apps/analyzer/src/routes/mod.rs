pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/upload_resume", post(handlers::handle_upload_resume))
        .route(
            "/check_username/:username",
            get(handlers::handle_check_username),
        )
        .route("/retrieve_document", get(handlers::handle_retrieve_document))
        .route("/get_all_documents", get(handlers::handle_get_all_documents))
        .route(
            "/download_reportfile/:file_id",
            get(handlers::handle_download_reportfile),
        )
        .route(
            "/delete_report/:report_id",
            delete(handlers::handle_delete_report),
        )
        .layer(body_limit)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::pipeline::AnalysisPipeline;
    use crate::analysis::testing::{analysis_json, sample_resume, ScriptedInference};
    use crate::classifier::testing::StubModel;
    use crate::classifier::CategoryClassifier;
    use crate::config::Config;
    use crate::persistence::PersistenceCoordinator;
    use crate::report::PdfReportRenderer;
    use crate::storage::memory::{MemoryBlobStore, MemoryDocumentStore};

    const BOUNDARY: &str = "analyzer-test-boundary";

    fn test_config() -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            s3_bucket: "unused".to_string(),
            s3_endpoint: "http://unused".to_string(),
            s3_region: "us-east-1".to_string(),
            aws_access_key_id: "unused".to_string(),
            aws_secret_access_key: "unused".to_string(),
            anthropic_api_key: "unused".to_string(),
            classifier_url: "http://unused".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_upload_bytes: 1024 * 1024,
        }
    }

    fn app(inference: ScriptedInference) -> (Router, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = AppState {
            pipeline: AnalysisPipeline::new(
                Arc::new(inference),
                CategoryClassifier::new(Arc::new(StubModel::new("Python Developer"))),
            ),
            persistence: PersistenceCoordinator::new(
                Arc::new(MemoryDocumentStore::new()),
                blobs.clone(),
            ),
            renderer: Arc::new(PdfReportRenderer),
            config: test_config(),
        };
        (build_router(state), blobs)
    }

    fn happy_inference() -> ScriptedInference {
        ScriptedInference::new()
            .with("resume_validity", json!({"is_valid": true}))
            .with("resume_analysis", analysis_json(72, 68, 4))
            .with("overall_score", json!({"overall_score": 70}))
    }

    /// (field name, file name, content)
    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        raw_upload_request(multipart_body(parts))
    }

    fn raw_upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload_resume")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(ScriptedInference::new());
        let (status, body) = send_json(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_upload_success_then_read_download_and_delete() {
        let (app, blobs) = app(happy_inference());

        let (status, doc) = send_json(
            &app,
            upload_request(&[
                ("user_name", None, "jane"),
                ("job_description", None, "Backend role, Python and SQL"),
                ("file", Some("cv.txt"), sample_resume()),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["success"], true);
        assert_eq!(doc["data"]["ml_job_category"], "Python Developer");
        assert_eq!(doc["data"]["overall_score"], 70);
        assert_eq!(doc["resume_file_name"], "cv.txt");
        assert!(doc["error"].is_null());
        let id = doc["_id"].as_str().unwrap().to_string();
        let report_id = doc["resume_report_id"].as_str().unwrap().to_string();
        assert_eq!(blobs.len().await, 2);

        let (_, exists) = send_json(&app, get("/check_username/jane")).await;
        assert_eq!(exists["exists"], true);

        let (_, all) = send_json(&app, get("/get_all_documents?username=jane")).await;
        assert_eq!(all["Total_Analyses"], 1);
        assert_eq!(all["Total_Valid_Analyses"], 1);
        assert_eq!(all["Avg_ATS_Score"], 72.0);
        assert_eq!(all["Overall_Score_Change"], 0);

        let (_, one) = send_json(
            &app,
            get(&format!("/retrieve_document?user_name=jane&report_id={id}")),
        )
        .await;
        assert_eq!(one["document"]["_id"], id.as_str());

        let response = app
            .clone()
            .oneshot(get(&format!("/download_reportfile/{report_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment;"));
        let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/delete_report/{id}?username=jane"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send_json(&app, delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blobs.len().await, 0);

        let (_, gone) = send_json(
            &app,
            get(&format!("/retrieve_document?user_name=jane&report_id={id}")),
        )
        .await;
        assert!(gone["document"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_resume_is_stored_as_failure() {
        let (app, blobs) = app(happy_inference());

        let (status, doc) = send_json(
            &app,
            upload_request(&[
                ("user_name", None, "jane"),
                ("job_description", None, ""),
                ("uploaded_file", Some("cv.txt"), "Too short to be a resume."),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["success"], false);
        assert!(doc["data"].is_null());
        assert_eq!(doc["error"]["kind"], "InvalidInput");
        assert!(doc["resume_report_id"].is_null());
        assert_eq!(blobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_stored_with_generic_message() {
        let (app, _) = app(ScriptedInference::new());

        let (status, doc) = send_json(
            &app,
            upload_request(&[
                ("user_name", None, "jane"),
                ("file", Some("cv.txt"), sample_resume()),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["success"], false);
        assert_eq!(doc["error"]["kind"], "ProviderFailure");
        let message = doc["error"]["message"].as_str().unwrap();
        assert!(!message.contains("scripted"));
    }

    #[tokio::test]
    async fn test_upload_without_user_name_is_rejected() {
        let (app, blobs) = app(happy_inference());
        let (status, body) = send_json(
            &app,
            upload_request(&[("file", Some("cv.txt"), sample_resume())]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(blobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_truncated_extra_field_is_rejected() {
        let (app, blobs) = app(happy_inference());
        let mut body = multipart_body(&[
            ("user_name", None, "jane"),
            ("file", Some("cv.txt"), sample_resume()),
        ]);
        // drop the closing boundary and append a field that never ends
        body.truncate(body.len() - format!("--{BOUNDARY}--\r\n").len());
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"notes\"\r\n\r\nunterminated")
                .as_bytes(),
        );
        let (status, body) = send_json(&app, raw_upload_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(blobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_unsupported_file_type() {
        let (app, _) = app(happy_inference());
        let (status, body) = send_json(
            &app,
            upload_request(&[
                ("user_name", None, "jane"),
                ("file", Some("cv.docx"), "PK\x03\x04 not really a docx"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "EXTRACTION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_user_and_documents() {
        let (app, _) = app(ScriptedInference::new());

        let (_, exists) = send_json(&app, get("/check_username/nobody")).await;
        assert_eq!(exists["exists"], false);

        let (status, all) = send_json(&app, get("/get_all_documents?username=nobody")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all["Total_Analyses"], 0);
        assert_eq!(all["Avg_ATS_Score"], 0.0);
        assert_eq!(all["Overall_Score_Change"], 0);

        let (status, one) = send_json(
            &app,
            get("/retrieve_document?user_name=nobody&report_id=not-an-id"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(one["document"].is_null());
    }

    #[tokio::test]
    async fn test_missing_blob_and_document_are_404() {
        let (app, _) = app(ScriptedInference::new());

        let (status, body) = send_json(&app, get("/download_reportfile/garbage")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = send_json(
            &app,
            get("/download_reportfile/6f1c7a52-2d8e-4c36-9a51-2f0b8f9f4e10"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let delete = Request::builder()
            .method("DELETE")
            .uri("/delete_report/6f1c7a52-2d8e-4c36-9a51-2f0b8f9f4e10?username=jane")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send_json(&app, delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
