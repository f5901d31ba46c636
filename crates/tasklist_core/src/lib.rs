//! Core domain logic for tasklist.
//! This crate is the single source of truth for task-list invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{EmptyEditPolicy, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{Filter, Priority, Task, TaskId, TaskValidationError};
pub use repo::kv_repo::{
    KvRepository, MemoryKvRepository, RepoError, RepoResult, SqliteKvRepository,
};
pub use repo::task_snapshot::ImportFormatError;
pub use service::task_store::{
    EditOutcome, FilteredView, PersistenceError, StoreError, StoreEvent, StoreResult, TaskStore,
};
pub use service::theme_service::{Theme, ThemeService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
