//! Domain model for the task list.
//!
//! # Responsibility
//! - Define canonical data structures used by store logic.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Removal is a hard delete; ids are never recycled.

pub mod task;
