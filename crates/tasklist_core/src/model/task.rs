//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its persisted shape.
//! - Define view filters and task priority.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `text` is stored trimmed and is never empty.
//! - `created_at` never changes after construction.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque stable identifier of one task.
///
/// Kept as a string so ids written by older clients (for example
/// numeric timestamps) survive a load/save cycle unchanged.
pub type TaskId = String;

/// Relative importance of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseKeywordError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ParseKeywordError {
                kind: "priority",
                value: other.to_string(),
                expected: "low|medium|high",
            }),
        }
    }
}

/// View predicate selecting a subset of tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    /// Returns whether `task` is visible under this filter.
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = ParseKeywordError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(ParseKeywordError {
                kind: "filter",
                value: other.to_string(),
                expected: "all|active|completed",
            }),
        }
    }
}

/// Unknown keyword passed where a `Priority` or `Filter` was expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeywordError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl Display for ParseKeywordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported {} `{}`; expected {}",
            self.kind, self.value, self.expected
        )
    }
}

impl Error for ParseKeywordError {}

/// Task-level invariant violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Text is empty or whitespace-only.
    EmptyText,
    /// Identifier is empty or whitespace-only.
    EmptyId,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "task text cannot be empty"),
            Self::EmptyId => write!(f, "task id cannot be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// One user-tracked to-do item, in its persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds of the latest mutation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Task {
    /// Creates an active task with a generated id and the current timestamp.
    ///
    /// # Errors
    /// - `EmptyText` when `text` trims to empty.
    pub fn new(text: &str, priority: Priority) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4().to_string(), text, priority, now_epoch_ms())
    }

    /// Creates a task with a caller-provided identity and creation time.
    ///
    /// Used by load/import paths where identity already exists.
    pub fn with_id(
        id: impl Into<TaskId>,
        text: &str,
        priority: Priority,
        created_at: i64,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id: id.into(),
            text: normalize_text(text).ok_or(TaskValidationError::EmptyText)?,
            completed: false,
            priority,
            created_at,
            updated_at: None,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks id and text invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.trim().is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        if self.text.trim().is_empty() {
            return Err(TaskValidationError::EmptyText);
        }
        Ok(())
    }

    /// Returns whether the task still needs doing.
    pub fn is_active(&self) -> bool {
        !self.completed
    }

    /// Flips completion state and stamps `updated_at`.
    pub fn toggle(&mut self) -> bool {
        self.set_completed(!self.completed);
        self.completed
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.touch();
    }

    /// Replaces text with an already-normalized value.
    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Some(now_epoch_ms());
    }
}

/// Trims user input; `None` when nothing is left.
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{normalize_text, Filter, Priority, Task, TaskValidationError};

    #[test]
    fn new_task_trims_text_and_defaults_to_active_medium() {
        let task = Task::new("  buy milk \n", Priority::default()).unwrap();
        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.updated_at.is_none());
        assert!(!task.id.is_empty());
    }

    #[test]
    fn new_task_rejects_whitespace_text() {
        let err = Task::new(" \t ", Priority::High).unwrap_err();
        assert_eq!(err, TaskValidationError::EmptyText);
    }

    #[test]
    fn generated_ids_do_not_repeat() {
        let first = Task::new("a", Priority::Low).unwrap();
        let second = Task::new("a", Priority::Low).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn toggle_flips_and_stamps_updated_at() {
        let mut task = Task::with_id("1", "x", Priority::Medium, 10).unwrap();
        assert!(task.toggle());
        assert!(task.completed);
        assert!(task.updated_at.is_some());
        assert!(!task.toggle());
        assert_eq!(task.created_at, 10);
    }

    #[test]
    fn filter_matches_partition_tasks() {
        let mut done = Task::with_id("d", "done", Priority::Medium, 0).unwrap();
        done.completed = true;
        let open = Task::with_id("o", "open", Priority::Medium, 0).unwrap();

        assert!(Filter::All.matches(&done) && Filter::All.matches(&open));
        assert!(Filter::Active.matches(&open) && !Filter::Active.matches(&done));
        assert!(Filter::Completed.matches(&done) && !Filter::Completed.matches(&open));
    }

    #[test]
    fn keywords_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" Active ".parse::<Filter>().unwrap(), Filter::Active);
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert!(err.to_string().contains("low|medium|high"));
    }

    #[test]
    fn serialized_shape_uses_camel_case_and_omits_missing_update() {
        let task = Task::with_id("1", "buy milk", Priority::Low, 42).unwrap();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["createdAt"], 42);
        assert_eq!(json["priority"], "low");
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn normalize_text_rejects_blank() {
        assert_eq!(normalize_text("   "), None);
        assert_eq!(normalize_text(" a b ").as_deref(), Some("a b"));
    }
}
