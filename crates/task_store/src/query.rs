//! Query parsing, filtering and pagination for task listings.
//!
//! The same rules apply to both backends. The in-memory store runs
//! [`TaskFilter::apply`] over its snapshot, while the Postgres store pushes the
//! parsed filter down into SQL.

use entities::Task;
use serde::Deserialize;

use crate::{TaskStoreError, TaskStoreResult};

/// Upper bound for a page size. Larger requested limits are clamped.
pub const MAX_LIMIT: usize = 100;

/// Page size used by database listings when no limit is supplied.
pub const DEFAULT_DB_LIMIT: usize = 20;

/// Listing parameters as received from the caller, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTaskQuery {
    /// Case-insensitive title substring.
    pub q: Option<String>,
    /// Completion state filter.
    pub done: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Number of matching tasks to skip.
    pub offset: Option<String>,
}

/// Validated listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive title substring.
    pub q: Option<String>,
    /// Completion state filter.
    pub done: Option<bool>,
    /// Page size, already clamped to [`MAX_LIMIT`].
    pub limit: Option<usize>,
    /// Number of matching tasks to skip.
    pub offset: Option<usize>,
}

impl TaskFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates raw parameters. Blank values count as absent.
    pub fn parse(raw: &RawTaskQuery) -> TaskStoreResult<Self> {
        let done = present(&raw.done)
            .map(|value| {
                parse_bool(value).ok_or_else(|| TaskStoreError::validation("invalid done param"))
            })
            .transpose()?;

        let limit = present(&raw.limit)
            .map(|value| match value.parse::<i64>() {
                Ok(limit) if limit > 0 => Ok(clamp_limit(limit as u64)),
                _ => Err(TaskStoreError::validation("invalid limit")),
            })
            .transpose()?;

        let offset = present(&raw.offset)
            .map(|value| match value.parse::<i64>() {
                Ok(offset) if offset >= 0 => usize::try_from(offset)
                    .map_err(|_| TaskStoreError::validation("invalid offset")),
                _ => Err(TaskStoreError::validation("invalid offset")),
            })
            .transpose()?;

        Ok(Self {
            q: present(&raw.q).map(str::to_string),
            done,
            limit,
            offset,
        })
    }

    /// Filters by title substring.
    pub fn with_query(mut self, q: impl Into<String>) -> Self {
        let q = q.into();
        self.q = if q.is_empty() { None } else { Some(q) };
        self
    }

    /// Filters by completion state.
    pub fn with_done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    /// Sets the page size, clamped to [`MAX_LIMIT`].
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(clamp_limit(limit as u64));
        self
    }

    /// Sets the page offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if no parameter was supplied at all.
    pub fn is_unfiltered(&self) -> bool {
        self.q.is_none() && self.done.is_none() && self.limit.is_none() && self.offset.is_none()
    }

    /// Returns true if the task satisfies the `q` and `done` predicates.
    pub fn matches(&self, task: &Task) -> bool {
        self.done.is_none_or(|done| task.done == done)
            && self.q.as_ref().is_none_or(|q| {
                task.title.to_lowercase().contains(&q.to_lowercase())
            })
    }

    /// Filters and paginates an in-memory candidate list.
    ///
    /// Without a limit every matching task from the offset onwards is
    /// returned.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let matching: Vec<&Task> = tasks.iter().filter(|task| self.matches(task)).collect();
        paginate(&matching, self.offset.unwrap_or(0), self.limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Page size for a database listing.
    pub fn db_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_DB_LIMIT)
    }

    /// Offset for a database listing.
    pub fn db_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Returns `items[offset..min(offset + limit, total)]`.
///
/// An offset at or past the end yields an empty page.
pub fn paginate<T: Clone>(items: &[T], offset: usize, limit: Option<usize>) -> Vec<T> {
    let total = items.len();
    if offset >= total {
        return Vec::new();
    }
    let end = limit.map_or(total, |limit| offset.saturating_add(limit).min(total));
    items[offset..end].to_vec()
}

/// Parses a boolean query token.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
/// counterparts.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Trims a task title and rejects it if nothing is left.
pub fn normalize_title(title: &str) -> TaskStoreResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskStoreError::validation("title cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn clamp_limit(limit: u64) -> usize {
    usize::try_from(limit).map_or(MAX_LIMIT, |limit| limit.min(MAX_LIMIT))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
