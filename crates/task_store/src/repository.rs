//! Cache-aside task repository.
//!
//! The durable store is the source of truth. Full, unfiltered listings are
//! served from the cache when possible and written back on a miss; filtered
//! listings always go to the store. Every successful mutation deletes the
//! owner's cache entry after the durable write has completed.
//!
//! A listing loaded from the store is not written back when a mutation for
//! the same user completed while it was loading.
//!
//! Cache failures never fail a request. They are logged, counted and treated
//! as a miss (reads) or skipped (writes and invalidations).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use entities::{NewTask, Task, TaskId, TaskPatch, UserId};
use tracing::{debug, info, warn};

use crate::cache::{tasks_cache_key, CacheError, CacheResult, TASKS_CACHE_TTL};
use crate::query::normalize_title;
use crate::{TaskCache, TaskFilter, TaskStore, TaskStoreError, TaskStoreResult};

/// Which path served a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a live cache entry.
    Hit,
    /// Loaded from the store and written back to the cache.
    Miss,
    /// Filtered or paginated; the cache was not consulted.
    Bypassed,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypassed => "BYPASS",
        }
    }
}

/// Result of a listing.
#[derive(Debug, Clone)]
pub struct TaskListing {
    pub tasks: Vec<Task>,
    pub cache: CacheStatus,
}

/// Number of invalidation counters shared between users.
const GENERATION_STRIPES: usize = 64;

/// Task repository combining a durable store with a list cache.
///
/// Each user maps to an invalidation counter that every mutation bumps. A
/// listing loaded from the store is only written back if the counter did not
/// move while it was loaded, so a slow reader cannot reinstate a list older
/// than the last mutation.
pub struct TaskRepository<S, C> {
    store: S,
    cache: C,
    ttl: Duration,
    cache_timeout: Duration,
    cache_failures: AtomicU64,
    generations: Box<[AtomicU64]>,
}

impl<S, C> std::fmt::Debug for TaskRepository<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRepository")
            .field("ttl", &self.ttl)
            .field("cache_timeout", &self.cache_timeout)
            .field("cache_failures", &self.cache_failures.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S: TaskStore, C: TaskCache> TaskRepository<S, C> {
    /// Upper bound for a single cache call.
    pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(500);

    /// Creates a repository with the default TTL and cache timeout.
    pub fn new(store: S, cache: C) -> Self {
        Self {
            store,
            cache,
            ttl: TASKS_CACHE_TTL,
            cache_timeout: Self::DEFAULT_CACHE_TIMEOUT,
            cache_failures: AtomicU64::new(0),
            generations: (0..GENERATION_STRIPES).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Sets the lifetime of cached lists.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the upper bound for a single cache call.
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Returns the durable store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Number of cache failures swallowed so far.
    pub fn cache_failures(&self) -> u64 {
        self.cache_failures.load(Ordering::Relaxed)
    }

    /// Lists tasks, using the cache only when no parameter was supplied.
    pub async fn list(&self, user_id: UserId, filter: &TaskFilter) -> TaskStoreResult<TaskListing> {
        if filter.is_unfiltered() {
            self.list_full_unfiltered(user_id).await
        } else {
            self.list_filtered(user_id, filter).await
        }
    }

    /// Returns the user's complete task list, newest first.
    pub async fn list_full_unfiltered(&self, user_id: UserId) -> TaskStoreResult<TaskListing> {
        let key = tasks_cache_key(user_id);

        if let Some(tasks) = self.read_cached(&key).await {
            debug!(user_id, key = %key, "Task list cache hit");
            return Ok(TaskListing {
                tasks,
                cache: CacheStatus::Hit,
            });
        }

        debug!(user_id, key = %key, "Task list cache miss");
        let generation = self.generation(user_id).load(Ordering::SeqCst);
        let tasks = self.store.list_tasks(user_id).await?;
        self.write_cached(user_id, &key, &tasks, generation).await;

        Ok(TaskListing {
            tasks,
            cache: CacheStatus::Miss,
        })
    }

    /// Queries the store directly with the filter pushed down.
    pub async fn list_filtered(
        &self,
        user_id: UserId,
        filter: &TaskFilter,
    ) -> TaskStoreResult<TaskListing> {
        let tasks = self.store.query_tasks(user_id, filter).await?;
        Ok(TaskListing {
            tasks,
            cache: CacheStatus::Bypassed,
        })
    }

    /// Gets one of the user's tasks.
    pub async fn get_by_id(&self, user_id: UserId, task_id: TaskId) -> TaskStoreResult<Task> {
        self.store
            .get_task(user_id, task_id)
            .await?
            .ok_or_else(|| TaskStoreError::not_found("Task", task_id))
    }

    /// Creates a task for the user.
    pub async fn create(&self, user_id: UserId, new_task: NewTask) -> TaskStoreResult<Task> {
        let title = normalize_title(&new_task.title)?;

        let task = self
            .store
            .create_task(user_id, &title, new_task.done)
            .await?;
        self.invalidate(user_id).await;

        info!(user_id, task_id = task.id, "Task created");
        Ok(task)
    }

    /// Applies the supplied fields of a patch to one of the user's tasks.
    pub async fn update(
        &self,
        user_id: UserId,
        task_id: TaskId,
        mut patch: TaskPatch,
    ) -> TaskStoreResult<Task> {
        if let Some(title) = &patch.title {
            patch.title = Some(normalize_title(title)?);
        }

        let task = self
            .store
            .update_task(user_id, task_id, &patch)
            .await?
            .ok_or_else(|| TaskStoreError::not_found("Task", task_id))?;
        self.invalidate(user_id).await;

        info!(user_id, task_id, "Task updated");
        Ok(task)
    }

    /// Deletes one of the user's tasks.
    pub async fn delete(&self, user_id: UserId, task_id: TaskId) -> TaskStoreResult<()> {
        if !self.store.delete_task(user_id, task_id).await? {
            return Err(TaskStoreError::not_found("Task", task_id));
        }
        self.invalidate(user_id).await;

        info!(user_id, task_id, "Task deleted");
        Ok(())
    }

    async fn read_cached(&self, key: &str) -> Option<Vec<Task>> {
        let bytes = match self.bounded(self.cache.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                self.record_failure("get", key, &e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(tasks) => Some(tasks),
            Err(e) => {
                self.record_failure("decode", key, &CacheError::from(e));
                None
            }
        }
    }

    async fn write_cached(
        &self,
        user_id: UserId,
        key: &str,
        tasks: &[Task],
        generation: u64,
    ) {
        if self.generation(user_id).load(Ordering::SeqCst) != generation {
            debug!(user_id, key = %key, "Task list changed while loading, not caching");
            return;
        }

        let bytes = match serde_json::to_vec(tasks) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.record_failure("encode", key, &CacheError::from(e));
                return;
            }
        };

        if let Err(e) = self.bounded(self.cache.set(key, bytes, self.ttl)).await {
            self.record_failure("set", key, &e);
            return;
        }

        // A mutation that landed between the check and the set may have
        // deleted the key before the set.
        if self.generation(user_id).load(Ordering::SeqCst) != generation {
            self.delete_cached(key).await;
        }
    }

    async fn invalidate(&self, user_id: UserId) {
        self.generation(user_id).fetch_add(1, Ordering::SeqCst);
        self.delete_cached(&tasks_cache_key(user_id)).await;
    }

    async fn delete_cached(&self, key: &str) {
        if let Err(e) = self.bounded(self.cache.delete(key)).await {
            self.record_failure("delete", key, &e);
        }
    }

    fn generation(&self, user_id: UserId) -> &AtomicU64 {
        &self.generations[user_id.rem_euclid(GENERATION_STRIPES as i64) as usize]
    }

    async fn bounded<T>(&self, call: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        tokio::time::timeout(self.cache_timeout, call)
            .await
            .map_err(|_| CacheError::Timeout(self.cache_timeout))?
    }

    fn record_failure(&self, operation: &'static str, key: &str, error: &CacheError) {
        self.cache_failures.fetch_add(1, Ordering::Relaxed);
        warn!(operation, key = %key, error = %error, "Cache operation failed, continuing without cache");
    }
}
