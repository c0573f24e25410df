//! Task store trait definitions.

use std::time::Duration;

use async_trait::async_trait;
use entities::{Task, TaskId, TaskPatch, UserId};

use crate::{CacheResult, TaskFilter, TaskStoreResult};

/// Durable, user-scoped task storage.
///
/// Every operation is scoped to `user_id`; rows owned by other users behave
/// exactly like missing rows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Lists all tasks owned by the user, newest first.
    async fn list_tasks(&self, user_id: UserId) -> TaskStoreResult<Vec<Task>>;

    /// Lists the user's tasks matching a filter, newest first.
    ///
    /// The filter's database limit and offset are always applied.
    async fn query_tasks(&self, user_id: UserId, filter: &TaskFilter)
        -> TaskStoreResult<Vec<Task>>;

    /// Gets a task by ID.
    async fn get_task(&self, user_id: UserId, task_id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Inserts a task with a normalized title and returns the persisted row.
    async fn create_task(&self, user_id: UserId, title: &str, done: bool)
        -> TaskStoreResult<Task>;

    /// Applies a normalized patch. Returns `None` if no row matched.
    async fn update_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> TaskStoreResult<Option<Task>>;

    /// Deletes a task. Returns `false` if no row matched.
    async fn delete_task(&self, user_id: UserId, task_id: TaskId) -> TaskStoreResult<bool>;
}

/// Byte-oriented key-value cache with expiry.
///
/// Implementations must tolerate an unreachable backend: `get` then reports
/// nothing and `set`/`delete` do nothing.
#[async_trait]
pub trait TaskCache: Send + Sync {
    /// Reads a live entry.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Writes an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Removes an entry.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
