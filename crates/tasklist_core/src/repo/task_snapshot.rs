//! JSON codec for the persisted task array.
//!
//! # Responsibility
//! - Encode the full task collection as one JSON array document.
//! - Decode documents written by this or older clients, tolerating
//!   missing or loosely typed fields.
//!
//! # Invariants
//! - Decoding never yields two tasks with the same id (first one wins).
//! - Decoding never yields a task with blank text.
//! - `decode_tasks(encode_tasks(x))` reproduces `x` for any valid collection.

use crate::model::task::{normalize_text, now_epoch_ms, Priority, Task};
use log::warn;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Document-level shape failure. Per-item problems are skipped, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportFormatError {
    /// Text is not parseable JSON.
    InvalidJson(String),
    /// JSON parsed, but the top-level value is not an array.
    NotAnArray(&'static str),
}

impl Display for ImportFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(message) => write!(f, "document is not valid JSON: {message}"),
            Self::NotAnArray(found) => {
                write!(f, "expected a JSON array of tasks, found {found}")
            }
        }
    }
}

impl Error for ImportFormatError {}

/// Result of decoding one task-array document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTasks {
    pub tasks: Vec<Task>,
    /// Items dropped because they were unusable or duplicated.
    pub skipped: usize,
}

/// Serializes tasks in the compact persisted form.
pub fn encode_tasks(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string(tasks)
}

/// Serializes tasks as a human-readable export document.
pub fn encode_tasks_pretty(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tasks)
}

/// Parses a task-array document.
///
/// # Errors
/// - `InvalidJson` when `raw` is not JSON.
/// - `NotAnArray` when the top-level value is anything but an array.
pub fn decode_tasks(raw: &str) -> Result<DecodedTasks, ImportFormatError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|err| ImportFormatError::InvalidJson(err.to_string()))?;
    let items = match document {
        Value::Array(items) => items,
        other => return Err(ImportFormatError::NotAnArray(json_kind(&other))),
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.iter().enumerate() {
        let Some(task) = item.as_object().and_then(|fields| decode_task(index, fields)) else {
            warn!("event=snapshot_decode module=repo status=skip index={index} reason=unusable_item");
            skipped += 1;
            continue;
        };
        if !seen.insert(task.id.clone()) {
            warn!("event=snapshot_decode module=repo status=skip index={index} reason=duplicate_id");
            skipped += 1;
            continue;
        }
        tasks.push(task);
    }

    Ok(DecodedTasks { tasks, skipped })
}

fn decode_task(index: usize, fields: &Map<String, Value>) -> Option<Task> {
    let text = fields
        .get("text")
        .and_then(Value::as_str)
        .and_then(normalize_text)?;

    let id = match fields.get("id") {
        Some(Value::String(value)) if !value.trim().is_empty() => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        _ => {
            warn!("event=snapshot_decode module=repo status=repair index={index} reason=missing_id");
            Uuid::new_v4().to_string()
        }
    };

    let priority = fields
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|value| value.parse::<Priority>().ok())
        .unwrap_or_default();

    Some(Task {
        id,
        text,
        completed: fields
            .get("completed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        priority,
        created_at: fields
            .get("createdAt")
            .and_then(epoch_ms)
            .unwrap_or_else(now_epoch_ms),
        updated_at: fields.get("updatedAt").and_then(epoch_ms),
    })
}

fn epoch_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_tasks, encode_tasks, ImportFormatError};
    use crate::model::task::{Priority, Task};

    #[test]
    fn decode_rejects_non_array_documents() {
        assert_eq!(
            decode_tasks(r#"{"id":"1"}"#).unwrap_err(),
            ImportFormatError::NotAnArray("an object")
        );
        assert!(matches!(
            decode_tasks("not json").unwrap_err(),
            ImportFormatError::InvalidJson(_)
        ));
    }

    #[test]
    fn decode_fills_defaults_for_sparse_items() {
        let decoded = decode_tasks(r#"[{"id":"1","text":" buy milk "}]"#).unwrap();
        assert_eq!(decoded.skipped, 0);
        let task = &decoded.tasks[0];
        assert_eq!(task.id, "1");
        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.updated_at.is_none());
    }

    #[test]
    fn decode_accepts_numeric_ids_and_timestamps() {
        let decoded = decode_tasks(
            r#"[{"id":1712000000000,"text":"a","completed":true,"createdAt":"1712000000000","updatedAt":1712000000500.0,"priority":"HIGH"}]"#,
        )
        .unwrap();
        let task = &decoded.tasks[0];
        assert_eq!(task.id, "1712000000000");
        assert!(task.completed);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.created_at, 1_712_000_000_000);
        assert_eq!(task.updated_at, Some(1_712_000_000_500));
    }

    #[test]
    fn decode_skips_blank_text_non_objects_and_duplicate_ids() {
        let decoded = decode_tasks(
            r#"[{"id":"1","text":"keep"},{"id":"2","text":"   "},42,{"id":"1","text":"dup"}]"#,
        )
        .unwrap();
        assert_eq!(decoded.tasks.len(), 1);
        assert_eq!(decoded.tasks[0].text, "keep");
        assert_eq!(decoded.skipped, 3);
    }

    #[test]
    fn decode_assigns_id_when_missing() {
        let decoded = decode_tasks(r#"[{"text":"orphan"}]"#).unwrap();
        assert!(!decoded.tasks[0].id.is_empty());
    }

    #[test]
    fn encoded_collection_decodes_to_equal_tasks() {
        let mut done = Task::with_id("a", "first", Priority::Low, 5).unwrap();
        done.set_completed(true);
        let open = Task::with_id("b", "second", Priority::High, 6).unwrap();
        let tasks = vec![done, open];

        let decoded = decode_tasks(&encode_tasks(&tasks).unwrap()).unwrap();
        assert_eq!(decoded.tasks, tasks);
    }
}
