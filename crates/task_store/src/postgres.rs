//! PostgreSQL task store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Task, TaskId, TaskPatch, UserId};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::{TaskFilter, TaskStore, TaskStoreResult};

/// Default number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;

const TASK_COLUMNS: &str = "id, title, done, created_at, updated_at";

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PgStoreOptions {
    /// Maximum open connections.
    pub max_connections: u32,
    /// Maximum lifetime of one connection.
    pub max_lifetime: Duration,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PgStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_lifetime: Duration::from_secs(5 * 60),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl PgStoreOptions {
    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .max_lifetime(self.max_lifetime)
            .acquire_timeout(self.acquire_timeout)
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    done: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            done: row.done,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Task store backed by the `tasks` table.
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and verifies the database is reachable.
    pub async fn connect(database_url: &str, options: &PgStoreOptions) -> TaskStoreResult<Self> {
        let pool = options.pool_options().connect(database_url).await?;
        info!(
            max_connections = options.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::new(pool))
    }

    /// Creates a pool that connects on first use.
    pub fn connect_lazy(database_url: &str, options: &PgStoreOptions) -> TaskStoreResult<Self> {
        let pool = options.pool_options().connect_lazy(database_url)?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `tasks` table and its listing index if missing.
    pub async fn init(&self) -> TaskStoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                title TEXT NOT NULL,
                done BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tasks_user_created_at
            ON tasks (user_id, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Builds a `LIKE` pattern matching `q` as a literal substring.
///
/// The input is lowercased; `\`, `%` and `_` are escaped.
pub(crate) fn like_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn filtered_query(user_id: UserId, filter: &TaskFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = "));
    builder.push_bind(user_id);

    if let Some(done) = filter.done {
        builder.push(" AND done = ").push_bind(done);
    }
    if let Some(q) = &filter.q {
        builder
            .push(" AND LOWER(title) LIKE ")
            .push_bind(like_pattern(q));
    }

    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(filter.db_limit() as i64)
        .push(" OFFSET ")
        .push_bind(filter.db_offset() as i64);
    builder
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list_tasks(&self, user_id: UserId) -> TaskStoreResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn query_tasks(
        &self,
        user_id: UserId,
        filter: &TaskFilter,
    ) -> TaskStoreResult<Vec<Task>> {
        let mut builder = filtered_query(user_id, filter);
        debug!(sql = builder.sql(), "Running filtered task query");

        let rows: Vec<TaskRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn get_task(&self, user_id: UserId, task_id: TaskId) -> TaskStoreResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Task::from))
    }

    async fn create_task(&self, user_id: UserId, title: &str, done: bool) -> TaskStoreResult<Task> {
        let row: TaskRow = sqlx::query_as(&format!(
            "INSERT INTO tasks (user_id, title, done) \
             VALUES ($1, $2, $3) \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(user_id)
        .bind(title)
        .bind(done)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> TaskStoreResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            "UPDATE tasks SET \
                 title = COALESCE($1, title), \
                 done = COALESCE($2, done), \
                 updated_at = CASE WHEN $3 THEN NOW() ELSE updated_at END \
             WHERE id = $4 AND user_id = $5 \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(patch.title.as_deref())
        .bind(patch.done)
        .bind(!patch.is_empty())
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Task::from))
    }

    async fn delete_task(&self, user_id: UserId, task_id: TaskId) -> TaskStoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Go"), "%go%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn test_filtered_query_sql() {
        let filter = TaskFilter::new().with_query("go").with_done(true).with_limit(5);
        let builder = filtered_query(7, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT id, title, done, created_at, updated_at FROM tasks WHERE user_id = $1 \
             AND done = $2 AND LOWER(title) LIKE $3 \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_filtered_query_without_predicates() {
        let builder = filtered_query(7, &TaskFilter::new().with_offset(40));

        assert_eq!(
            builder.sql(),
            "SELECT id, title, done, created_at, updated_at FROM tasks WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
    }
}
