//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable key/value contract the services write through.
//! - Own the JSON shape of persisted task collections.
//!
//! # Invariants
//! - Repository APIs surface storage failures; they never panic on bad data.

pub mod kv_repo;
pub mod task_snapshot;
