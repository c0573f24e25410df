//! API endpoints.

pub mod system;
pub mod tasks;
pub mod tasks_db;

use axum::{Router, middleware, routing::get};
use task_store::{TaskCache, TaskStore};

use crate::middleware::auth::auth_middleware;
use crate::state::SharedState;

/// Creates the API router.
///
/// The `/tasksdb` routes are only mounted when a repository is configured
/// and always sit behind the authentication middleware.
pub fn create_router<S, C>(state: &SharedState<S, C>) -> Router<SharedState<S, C>>
where
    S: TaskStore + 'static,
    C: TaskCache + 'static,
{
    let router = Router::new()
        .route("/", get(system::welcome))
        .route("/health", get(system::health))
        // Non-persistent task list
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        );

    if !state.database_enabled() {
        return router;
    }

    let database_routes = Router::new()
        .route(
            "/tasksdb",
            get(tasks_db::list_tasks).post(tasks_db::create_task),
        )
        .route(
            "/tasksdb/{id}",
            get(tasks_db::get_task)
                .patch(tasks_db::update_task)
                .delete(tasks_db::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S, C>,
        ));

    router.merge(database_routes)
}
