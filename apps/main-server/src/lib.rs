//! Task list server.
//!
//! Serves a non-persistent task list under `/tasks` and, when a database is
//! configured, a per-user durable task list with a list cache under
//! `/tasksdb`.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

use auth::{JwtConfig, JwtManager};
use axum::Router;
use task_store::{MemoryTaskStore, TaskCache, TaskRepository, TaskStore};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::state::{SharedState, create_shared_state};

/// Creates the application router with all routes configured.
pub fn create_app<S, C>(state: SharedState<S, C>) -> Router
where
    S: TaskStore + 'static,
    C: TaskCache + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let request_timeout = state.config.request_timeout;

    api::create_router(&state)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Creates the application state.
///
/// A JWT manager is built whenever a repository is given and a secret is
/// configured.
pub fn create_state<S: TaskStore, C: TaskCache>(
    config: Config,
    memory: MemoryTaskStore,
    repository: Option<TaskRepository<S, C>>,
) -> SharedState<S, C> {
    let jwt_manager = if repository.is_some() {
        config.jwt_secret.as_ref().map(|secret| {
            let jwt_config =
                JwtConfig::new(secret).with_expiration_hours(config.jwt_expiration_hours);
            JwtManager::new(jwt_config)
        })
    } else {
        None
    };

    create_shared_state(config, memory, repository, jwt_manager)
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
