pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::audit::handlers as audit_handlers;
use crate::pipeline::handlers as pipeline_handlers;
use crate::state::AppState;

/// Headroom for multipart framing and text fields on top of the file payloads.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_file_size_bytes
        .saturating_mul(state.config.max_files_per_request)
        .saturating_add(BODY_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/analyze",
            post(pipeline_handlers::handle_analyze).layer(DefaultBodyLimit::max(body_limit)),
        )
        // Audit read side
        .route("/logs/:user_id", get(audit_handlers::handle_user_logs))
        .route(
            "/activity/recent",
            get(audit_handlers::handle_recent_activity),
        )
        .route("/stats", get(audit_handlers::handle_stats))
        .route(
            "/requests/:request_id",
            get(audit_handlers::handle_request_details),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::audit::{AuditLogStore, InMemoryAuditLogStore};
    use crate::config::Config;
    use crate::pipeline::tests::ScriptedExtractor;
    use crate::pipeline::{Pipeline, PipelineSettings};
    use crate::summarization::RuleBasedSummarizer;

    const BOUNDARY: &str = "curriculum-test-boundary";

    fn test_app() -> Router {
        let config = Config::test_defaults();
        let extractor = Arc::new(ScriptedExtractor::default());
        let summarizer = Arc::new(RuleBasedSummarizer::new());
        let audit: Arc<dyn AuditLogStore> = Arc::new(InMemoryAuditLogStore::new());
        let pipeline = Pipeline::new(
            extractor.clone(),
            summarizer.clone(),
            audit.clone(),
            PipelineSettings::from_config(&config),
        );
        build_router(AppState {
            config,
            pipeline: Arc::new(pipeline),
            audit,
            extractor,
            summarizer,
        })
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str),
    }

    fn multipart(parts: &[Part<'_>]) -> Request<Body> {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match part {
                Part::Text(name, value) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )),
                Part::File(file_name, content_type, content) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
                     Content-Type: {content_type}\r\n\r\n{content}\r\n"
                )),
            }
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/analyze")
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

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_each_service() {
        let app = test_app();
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["services"]["database"], "healthy");
        assert_eq!(body["summarizer_backend"], "rules");
    }

    #[tokio::test]
    async fn test_analyze_then_read_audit_trail() {
        let app = test_app();
        let request = multipart(&[
            Part::Text("user_id", "recruiter-7"),
            Part::Text("query", "Python sênior"),
            Part::File(
                "ana.pdf",
                "application/pdf",
                "Ana Lima\nDesenvolvedora Sênior\n7 anos de experiência com Python",
            ),
            Part::File("notes.docx", "application/octet-stream", "binary"),
        ]);
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["processed_files"], 1);
        assert_eq!(body["failed_files"][0]["file_name"], "notes.docx");
        assert_eq!(body["failed_files"][0]["reason"], "UnsupportedType");
        assert_eq!(body["query_analysis"]["best_matches"][0]["file_name"], "ana.pdf");

        let request_id = body["request_id"].as_str().unwrap().to_string();
        let (status, logs) = send(&app, get("/logs/recruiter-7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(logs.as_array().unwrap().len(), 1);
        assert_eq!(logs[0]["request_id"], request_id.as_str());
        assert_eq!(logs[0]["files_count"], 2);

        let (status, entry) = send(&app, get(&format!("/requests/{request_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entry["query"], "Python sênior");

        let (_, skipped) = send(&app, get("/logs/recruiter-7?skip=1")).await;
        assert!(skipped.as_array().unwrap().is_empty());

        let (_, stats) = send(&app, get("/stats?user_id=recruiter-7")).await;
        assert_eq!(stats["total_requests"], 1);
        assert_eq!(stats["success_rate"], 100.0);
        assert_eq!(stats["query_params"]["user_id"], "recruiter-7");
        assert!(stats["query_params"]["start_date"].is_null());

        let (_, recent) = send(&app, get("/activity/recent?limit=0")).await;
        assert_eq!(recent.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_without_files_is_400_with_response_body() {
        let app = test_app();
        let (status, body) = send(&app, multipart(&[Part::Text("user_id", "u1")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "NoFilesProvided");

        let (_, stats) = send(&app, get("/stats")).await;
        assert_eq!(stats["total_requests"], 1);
    }

    #[tokio::test]
    async fn test_analyze_without_user_id_is_validation_error() {
        let app = test_app();
        let request = multipart(&[Part::File("a.pdf", "application/pdf", "Python")]);
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_request_is_404() {
        let app = test_app();
        let uri = format!("/requests/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_stats_rejects_inverted_range() {
        let app = test_app();
        let uri = "/stats?start_date=2025-02-01T00:00:00Z&end_date=2025-01-01T00:00:00Z";
        let (status, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
