//! Core use-case services.
//!
//! # Responsibility
//! - Hold in-memory state and route every durable write through a
//!   `KvRepository`.
//! - Keep the rendering layer decoupled from storage details.

pub mod task_store;
pub mod theme_service;
