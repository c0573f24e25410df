//! Task entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a task within its owning scope.
pub type TaskId = i64;

/// Identifier of an already-authenticated user.
pub type UserId = i64;

/// A single entry on a task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the owning scope.
    pub id: TaskId,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Whether the task is completed.
    pub done: bool,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task stamped with the current time.
    pub fn new(id: TaskId, title: impl Into<String>, done: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            done,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the supplied fields of a patch.
    ///
    /// Returns `true` if any field was supplied, in which case `updated_at`
    /// has been refreshed. The patch title is expected to be normalized
    /// already.
    pub fn apply(&mut self, patch: &TaskPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(done) = patch.done {
            self.done = done;
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Task title (trimmed before storing).
    pub title: String,
    /// Initial completion state.
    #[serde(default)]
    pub done: bool,
}

impl NewTask {
    /// Creates a new payload.
    pub fn new(title: impl Into<String>, done: bool) -> Self {
        Self {
            title: title.into(),
            done,
        }
    }
}

/// Partial update of a task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl TaskPatch {
    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the completion state.
    pub fn with_done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    /// Returns true if no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.done.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new(1, "Learn Go Basics", true);

        assert_eq!(task.id, 1);
        assert!(task.done);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_apply_empty_patch_keeps_timestamp() {
        let mut task = Task::new(1, "Write docs", false);
        let before = task.updated_at;

        assert!(!task.apply(&TaskPatch::default()));
        assert_eq!(task.updated_at, before);
    }

    #[test]
    fn test_apply_partial_patch() {
        let mut task = Task::new(7, "Write docs", false);

        assert!(task.apply(&TaskPatch::default().with_done(true)));
        assert_eq!(task.title, "Write docs");
        assert!(task.done);
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn test_patch_deserializes_missing_fields_as_none() {
        let patch: TaskPatch = serde_json::from_str(r#"{"done": false}"#).unwrap();
        assert_eq!(patch.title, None);
        assert_eq!(patch.done, Some(false));

        let new_task: NewTask = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(!new_task.done);
    }
}
