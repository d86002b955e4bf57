//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub knowledge_base: CheckResult,
    pub generation_backend: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - checks serving prerequisites
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    // The knowledge base is loaded before serving, so its presence in
    // state is the check; report its shape for operators
    let kb_check = CheckResult {
        status: "up".to_string(),
        detail: Some(format!(
            "{} categories, {} definitions, {} schedules",
            state.knowledge.categories().len(),
            state.knowledge.definitions().len(),
            state.knowledge.schedules().len()
        )),
    };

    let generation_check = CheckResult {
        status: "configured".to_string(),
        detail: Some(format!(
            "provider={} model={}",
            state.config.generation.provider, state.config.generation.model
        )),
    };

    Json(ReadyResponse {
        status: "ready".to_string(),
        checks: HealthChecks {
            knowledge_base: kb_check,
            generation_backend: generation_check,
        },
    })
}
