use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "curriculum-api",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health"
    }))
}

/// GET /health
/// Probes OCR, the summarizer backend and the audit store. Any failing probe
/// turns the overall status to "degraded"; the endpoint itself always answers 200.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let (ocr, llm, database) = tokio::join!(
        state.extractor.probe(),
        state.summarizer.probe(),
        state.audit.ping(),
    );

    let ocr = describe(ocr);
    let llm = describe(llm);
    let database = describe(database.map_err(|e| e.to_string()));
    let all_healthy = [&ocr, &llm, &database].iter().all(|s| s.as_str() == "healthy");

    Json(json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "summarizer_backend": state.summarizer.backend(),
        "audit_backend": state.audit.backend(),
        "services": {
            "ocr": ocr,
            "llm": llm,
            "database": database
        }
    }))
}

fn describe(probe: Result<(), String>) -> String {
    match probe {
        Ok(()) => "healthy".to_string(),
        Err(reason) => format!("unhealthy: {reason}"),
    }
}
