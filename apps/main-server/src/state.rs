//! Application state.

use std::sync::Arc;
use std::time::Instant;

use auth::JwtManager;
use task_store::{MemoryTaskStore, TaskCache, TaskRepository, TaskStore};

use crate::config::Config;

/// Shared application state.
pub struct AppState<S: TaskStore, C: TaskCache> {
    /// Server configuration.
    pub config: Config,
    /// Non-persistent task list served under `/tasks`.
    pub memory: MemoryTaskStore,
    /// Database-backed repository served under `/tasksdb`.
    pub repository: Option<TaskRepository<S, C>>,
    /// JWT manager (present whenever the repository is).
    pub jwt_manager: Option<JwtManager>,
    /// Process start time.
    pub started_at: Instant,
}

impl<S: TaskStore, C: TaskCache> AppState<S, C> {
    /// Creates new application state.
    pub fn new(
        config: Config,
        memory: MemoryTaskStore,
        repository: Option<TaskRepository<S, C>>,
        jwt_manager: Option<JwtManager>,
    ) -> Self {
        Self {
            config,
            memory,
            repository,
            jwt_manager,
            started_at: Instant::now(),
        }
    }

    /// Returns true if the database-backed routes are served.
    pub fn database_enabled(&self) -> bool {
        self.repository.is_some()
    }
}

/// Type alias for shared state.
pub type SharedState<S, C> = Arc<AppState<S, C>>;

/// Creates shared state.
pub fn create_shared_state<S: TaskStore, C: TaskCache>(
    config: Config,
    memory: MemoryTaskStore,
    repository: Option<TaskRepository<S, C>>,
    jwt_manager: Option<JwtManager>,
) -> SharedState<S, C> {
    Arc::new(AppState::new(config, memory, repository, jwt_manager))
}
