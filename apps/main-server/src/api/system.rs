//! Welcome and health endpoints.

use axum::{Json, extract::State};
use serde::Serialize;
use task_store::{TaskCache, TaskStore};

use crate::state::SharedState;

pub const WELCOME_MESSAGE: &str = "Welcome to the task list service";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    /// Number of tasks in the non-persistent list.
    pub tasks_count: usize,
}

/// Plain-text welcome endpoint.
pub async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

/// Health check endpoint.
pub async fn health<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        tasks_count: state.memory.len().await,
    })
}
