//! Non-persistent task list endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use entities::{NewTask, Task, TaskId, TaskPatch};
use task_store::{RawTaskQuery, TaskCache, TaskFilter, TaskStore};

use crate::error::ServerResult;
use crate::state::SharedState;

/// Lists tasks, optionally filtered and paginated.
pub async fn list_tasks<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    query: Result<Query<RawTaskQuery>, QueryRejection>,
) -> ServerResult<Json<Vec<Task>>> {
    let Query(raw) = query?;
    let filter = TaskFilter::parse(&raw)?;

    Ok(Json(state.memory.list(&filter).await))
}

/// Gets a task by ID.
pub async fn get_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    id: Result<Path<TaskId>, PathRejection>,
) -> ServerResult<Json<Task>> {
    let Path(id) = id?;

    Ok(Json(state.memory.get(id).await?))
}

/// Creates a task.
pub async fn create_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(new_task) = body?;
    let task = state.memory.create(new_task).await?;

    tracing::info!(task_id = task.id, "Created in-memory task");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/tasks/{}", task.id))],
        Json(task),
    ))
}

/// Updates the supplied fields of a task.
pub async fn update_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    id: Result<Path<TaskId>, PathRejection>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> ServerResult<Json<Task>> {
    let Path(id) = id?;
    let Json(patch) = body?;

    Ok(Json(state.memory.update(id, patch).await?))
}

/// Deletes a task.
pub async fn delete_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    id: Result<Path<TaskId>, PathRejection>,
) -> ServerResult<StatusCode> {
    let Path(id) = id?;
    state.memory.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
