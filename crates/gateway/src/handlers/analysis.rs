//! Analysis submission and result polling handlers
//!
//! Submission is fire-and-poll: the query is accepted, processed as an
//! independent task, and its outcome published atomically. Pollers fetch
//! the latest snapshot and watch the sequence number for freshness.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use lexforge_common::errors::{AppError, Result};

/// Query submission request
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
}

/// Submission acknowledgement
#[derive(Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,

    /// Correlation id for logs
    pub request_id: Uuid,

    /// Publication sequence at submission time; the result for this
    /// query will carry a strictly greater sequence number
    pub last_seq: u64,
}

/// Accept a query and process it asynchronously
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let request_id = Uuid::new_v4();
    let last_seq = state.publisher.last_seq();

    tracing::info!(
        request_id = %request_id,
        query_len = request.query.len(),
        "Query accepted"
    );

    // Each query runs as an independent task; per-request failures are
    // captured into the published outcome, so only publication I/O can
    // fail here
    let orchestrator = state.orchestrator.clone();
    let publisher = state.publisher.clone();
    let query = request.query;
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run(&query, &publisher).await {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                "Failed to publish analysis result"
            );
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            accepted: true,
            request_id,
            last_seq,
        }),
    ))
}

/// Fetch the latest published snapshot
pub async fn result(State(state): State<AppState>) -> Result<impl IntoResponse> {
    match state.publisher.snapshot().await {
        Some(snapshot) => Ok(Json(snapshot.as_ref().clone()).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
