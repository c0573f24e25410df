//! Database-backed task endpoints.
//!
//! Every handler acts on behalf of the authenticated user; tasks owned by
//! other users are indistinguishable from missing ones.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderName, StatusCode, header},
    response::IntoResponse,
};
use entities::{NewTask, Task, TaskId, TaskPatch};
use task_store::{RawTaskQuery, TaskCache, TaskFilter, TaskRepository, TaskStore};

use crate::error::{ServerError, ServerResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::state::{AppState, SharedState};

/// Response header reporting how a listing was served.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

fn repository<S: TaskStore, C: TaskCache>(
    state: &AppState<S, C>,
) -> ServerResult<&TaskRepository<S, C>> {
    state
        .repository
        .as_ref()
        .ok_or_else(|| ServerError::Internal("Task repository not configured".to_string()))
}

/// Lists the user's tasks, optionally filtered and paginated.
pub async fn list_tasks<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    user: AuthenticatedUser,
    query: Result<Query<RawTaskQuery>, QueryRejection>,
) -> ServerResult<impl IntoResponse> {
    let Query(raw) = query?;
    let filter = TaskFilter::parse(&raw)?;

    let listing = repository(&state)?.list(user.id, &filter).await?;

    Ok(([(X_CACHE, listing.cache.as_str())], Json(listing.tasks)))
}

/// Gets one of the user's tasks.
pub async fn get_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    user: AuthenticatedUser,
    id: Result<Path<TaskId>, PathRejection>,
) -> ServerResult<Json<Task>> {
    let Path(id) = id?;

    Ok(Json(repository(&state)?.get_by_id(user.id, id).await?))
}

/// Creates a task owned by the user.
pub async fn create_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    user: AuthenticatedUser,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(new_task) = body?;
    let task = repository(&state)?.create(user.id, new_task).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/tasksdb/{}", task.id))],
        Json(task),
    ))
}

/// Updates the supplied fields of one of the user's tasks.
pub async fn update_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    user: AuthenticatedUser,
    id: Result<Path<TaskId>, PathRejection>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> ServerResult<Json<Task>> {
    let Path(id) = id?;
    let Json(patch) = body?;

    Ok(Json(repository(&state)?.update(user.id, id, patch).await?))
}

/// Deletes one of the user's tasks.
pub async fn delete_task<S: TaskStore, C: TaskCache>(
    State(state): State<SharedState<S, C>>,
    user: AuthenticatedUser,
    id: Result<Path<TaskId>, PathRejection>,
) -> ServerResult<StatusCode> {
    let Path(id) = id?;
    repository(&state)?.delete(user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
