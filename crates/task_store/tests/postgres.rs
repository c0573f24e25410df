//! PostgreSQL integration tests.
//!
//! These run against the database in `DATABASE_URL` and are skipped when the
//! variable is not set. Each test works under its own user id.

use std::sync::atomic::{AtomicI64, Ordering};

use entities::{NewTask, TaskPatch};
use task_store::{
    CacheStatus, MemoryTaskCache, PgStoreOptions, PgTaskStore, TaskFilter, TaskRepository,
    TaskStore,
};

static NEXT_USER: AtomicI64 = AtomicI64::new(0);

async fn store() -> Option<PgTaskStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let store = PgTaskStore::connect(&url, &PgStoreOptions::default())
        .await
        .expect("connect to DATABASE_URL");
    store.init().await.expect("create tasks table");
    Some(store)
}

fn fresh_user() -> i64 {
    let base = chrono::Utc::now().timestamp_micros();
    base + NEXT_USER.fetch_add(1, Ordering::SeqCst)
}

#[tokio::test]
async fn test_create_get_roundtrip() {
    let Some(store) = store().await else { return };
    let user = fresh_user();

    let created = store.create_task(user, "Learn Rust", true).await.unwrap();
    assert_eq!(created.created_at, created.updated_at);

    let fetched = store.get_task(user, created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    assert!(store.get_task(user + 1, created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_coalesces_and_scopes() {
    let Some(store) = store().await else { return };
    let user = fresh_user();
    let task = store.create_task(user, "Draft", false).await.unwrap();

    let untouched = store
        .update_task(user, task.id, &TaskPatch::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.updated_at, task.updated_at);

    let updated = store
        .update_task(user, task.id, &TaskPatch::default().with_done(true))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Draft");
    assert!(updated.done);
    assert!(updated.updated_at >= task.updated_at);
    assert_eq!(updated.created_at, task.created_at);

    let foreign = store
        .update_task(user + 1, task.id, &TaskPatch::default().with_title("x"))
        .await
        .unwrap();
    assert!(foreign.is_none());
}

#[tokio::test]
async fn test_delete_reports_missing_rows() {
    let Some(store) = store().await else { return };
    let user = fresh_user();
    let task = store.create_task(user, "Temp", false).await.unwrap();

    assert!(!store.delete_task(user + 1, task.id).await.unwrap());
    assert!(store.delete_task(user, task.id).await.unwrap());
    assert!(!store.delete_task(user, task.id).await.unwrap());
}

#[tokio::test]
async fn test_query_pushes_filters_down() {
    let Some(store) = store().await else { return };
    let user = fresh_user();
    store.create_task(user, "Learn Go Basics", true).await.unwrap();
    store.create_task(user, "Setup GoTasker App", false).await.unwrap();
    store.create_task(user, "100% done", false).await.unwrap();

    let tasks = store
        .query_tasks(user, &TaskFilter::new().with_query("go").with_done(true))
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Learn Go Basics");

    let tasks = store
        .query_tasks(user, &TaskFilter::new().with_query("%"))
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "100% done");

    let page = store
        .query_tasks(user, &TaskFilter::new().with_limit(2).with_offset(2))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);

    let all = store.list_tasks(user).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].title, "100% done");
}

#[tokio::test]
async fn test_repository_over_postgres() {
    let Some(store) = store().await else { return };
    let user = fresh_user();
    let repo = TaskRepository::new(store, MemoryTaskCache::new());

    repo.create(user, NewTask::new("First", false)).await.unwrap();
    assert_eq!(repo.list_full_unfiltered(user).await.unwrap().cache, CacheStatus::Miss);
    assert_eq!(repo.list_full_unfiltered(user).await.unwrap().cache, CacheStatus::Hit);

    let second = repo.create(user, NewTask::new("Second", false)).await.unwrap();
    let listing = repo.list_full_unfiltered(user).await.unwrap();
    assert_eq!(listing.cache, CacheStatus::Miss);
    assert_eq!(listing.tasks.len(), 2);

    repo.delete(user, second.id).await.unwrap();
    assert!(repo.delete(user, second.id).await.unwrap_err().is_not_found());
}
