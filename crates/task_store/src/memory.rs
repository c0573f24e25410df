//! In-memory task store for the non-persistent mode.
//!
//! A single ordered list shared by every caller, with no ownership and no
//! cache. Mutations hold the write lock for the whole read-modify-write;
//! listings copy a snapshot under the read lock and filter outside it.

use entities::{NewTask, Task, TaskId, TaskPatch};
use tokio::sync::RwLock;

use crate::query::normalize_title;
use crate::{TaskFilter, TaskStoreError, TaskStoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    /// Highest id ever handed out. Deleted ids are never reissued.
    last_id: TaskId,
}

impl MemoryState {
    fn next_id(&mut self) -> TaskId {
        let max_existing = self.tasks.iter().map(|t| t.id).max().unwrap_or(0);
        self.last_id = self.last_id.max(max_existing) + 1;
        self.last_id
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }
}

/// Lock-guarded, non-persistent task list.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    state: RwLock<MemoryState>,
}

impl MemoryTaskStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given tasks in order.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let last_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        Self {
            state: RwLock::new(MemoryState { tasks, last_id }),
        }
    }

    /// Creates a store with the demo tasks served on a fresh start.
    pub fn seeded() -> Self {
        Self::with_tasks(vec![
            Task::new(1, "Learn Go Basics", true),
            Task::new(2, "Setup GoTasker App", false),
            Task::new(3, "Learn HTTP Status Code", false),
        ])
    }

    /// Returns the number of tasks.
    pub async fn len(&self) -> usize {
        self.state.read().await.tasks.len()
    }

    /// Returns true if the store holds no tasks.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Lists tasks in insertion order, filtered and paginated.
    pub async fn list(&self, filter: &TaskFilter) -> Vec<Task> {
        let snapshot = self.state.read().await.tasks.clone();
        filter.apply(&snapshot)
    }

    /// Gets a task by ID.
    pub async fn get(&self, id: TaskId) -> TaskStoreResult<Task> {
        let state = self.state.read().await;
        state
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| TaskStoreError::not_found("Task", id))
    }

    /// Appends a new task with the next free id.
    pub async fn create(&self, new_task: NewTask) -> TaskStoreResult<Task> {
        let title = normalize_title(&new_task.title)?;

        let mut state = self.state.write().await;
        let task = Task::new(state.next_id(), title, new_task.done);
        state.tasks.push(task.clone());
        Ok(task)
    }

    /// Applies the supplied fields of a patch.
    pub async fn update(&self, id: TaskId, mut patch: TaskPatch) -> TaskStoreResult<Task> {
        if let Some(title) = &patch.title {
            patch.title = Some(normalize_title(title)?);
        }

        let mut state = self.state.write().await;
        let index = state
            .position(id)
            .ok_or_else(|| TaskStoreError::not_found("Task", id))?;

        let task = &mut state.tasks[index];
        task.apply(&patch);
        Ok(task.clone())
    }

    /// Removes a task, keeping the order of the rest.
    pub async fn delete(&self, id: TaskId) -> TaskStoreResult<()> {
        let mut state = self.state.write().await;
        let index = state
            .position(id)
            .ok_or_else(|| TaskStoreError::not_found("Task", id))?;

        state.tasks.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn test_task_crud() {
        let store = MemoryTaskStore::new();

        // Create
        let created = store.create(NewTask::new("  Write tests ", false)).await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.title, "Write tests");
        assert_eq!(created.created_at, created.updated_at);

        // Get
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);

        // Update
        let updated = store
            .update(created.id, TaskPatch::default().with_done(true))
            .await
            .unwrap();
        assert!(updated.done);
        assert_eq!(updated.title, "Write tests");
        assert!(updated.updated_at >= updated.created_at);

        // Delete
        assert_ok!(store.delete(created.id).await);
        assert!(store.get(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let store = MemoryTaskStore::seeded();

        let err = store.create(NewTask::new("   ", false)).await.unwrap_err();
        assert!(err.is_validation());

        let err = store
            .update(1, TaskPatch::default().with_title(" "))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.get(1).await.unwrap().title, "Learn Go Basics");
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let store = MemoryTaskStore::seeded();
        let err = store
            .update(99, TaskPatch::default().with_done(true))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_empty_patch_keeps_updated_at() {
        let store = MemoryTaskStore::seeded();
        let before = store.get(2).await.unwrap();

        let after = store.update(2, TaskPatch::default()).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let store = MemoryTaskStore::seeded();

        assert_ok!(store.delete(2).await);
        assert!(store.delete(2).await.unwrap_err().is_not_found());
        assert!(store.delete(2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_preserves_order() {
        let store = MemoryTaskStore::seeded();
        assert_ok!(store.delete(2).await);

        let ids: Vec<TaskId> = store.list(&TaskFilter::new()).await.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = MemoryTaskStore::seeded();
        assert_ok!(store.delete(3).await);

        let task = store.create(NewTask::new("Next", false)).await.unwrap();
        assert_eq!(task.id, 4);
    }

    #[tokio::test]
    async fn test_list_filter_and_pagination() {
        let store = MemoryTaskStore::seeded();

        let filter = TaskFilter::new().with_query("go").with_done(true);
        let tasks = store.list(&filter).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Learn Go Basics");

        let page = store.list(&TaskFilter::new().with_limit(2).with_offset(2)).await;
        assert_eq!(page.len(), 1);

        assert!(store.list(&TaskFilter::new().with_offset(10)).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_assign_distinct_contiguous_ids() {
        const CALLERS: usize = 64;
        let store = Arc::new(MemoryTaskStore::new());

        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create(NewTask::new(format!("task {i}"), false))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()), "duplicate id assigned");
        }

        let expected: HashSet<TaskId> = (1..=CALLERS as TaskId).collect();
        assert_eq!(ids, expected);
        assert_eq!(store.len().await, CALLERS);
    }
}
