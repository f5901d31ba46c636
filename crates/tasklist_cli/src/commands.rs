//! Command surface shared by one-shot and interactive modes.
//!
//! # Responsibility
//! - Translate parsed commands into `TaskStore` / `ThemeService` calls.
//! - Resolve user-typed id prefixes to stored task ids.
//!
//! # Invariants
//! - Every command leaves the store usable, including on error.

use crate::render::{items_left, short_id};
use clap::Subcommand;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::path::PathBuf;
use tasklist_core::db::DbError;
use tasklist_core::{
    EditOutcome, Filter, ImportFormatError, KvRepository, PersistenceError, Priority, StoreConfig,
    StoreError, TaskId, TaskStore, ThemeService,
};

/// Task-level commands available in every mode.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum TaskCommand {
    /// Add a task to the top of the list.
    Add {
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show tasks, optionally switching the filter.
    #[command(alias = "ls")]
    List {
        #[arg(short, long)]
        filter: Option<Filter>,
    },
    /// Flip a task between active and completed.
    Toggle { id: String },
    /// Replace a task's text; blank text follows the empty-edit policy.
    Edit { id: String, text: Vec<String> },
    /// Delete a task.
    #[command(alias = "remove")]
    Rm { id: String },
    /// Delete every completed task.
    ClearCompleted,
    /// Complete everything, or reactivate everything if nothing is active.
    ToggleAll,
    /// Complete the given (or currently selected) tasks.
    BulkComplete { ids: Vec<String> },
    /// Delete the given (or currently selected) tasks.
    BulkDelete { ids: Vec<String> },
    /// Write all tasks as JSON to a file or stdout.
    Export { output: Option<PathBuf> },
    /// Replace all tasks with the JSON array in a file.
    Import { path: PathBuf },
    /// Show the theme preference, or flip it.
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

/// Failure of one command.
#[derive(Debug)]
pub enum CliError {
    Store(StoreError),
    Db(DbError),
    Io(io::Error),
    UnknownTask(String),
    AmbiguousTask { prefix: String, matches: usize },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "storage unavailable: {err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::UnknownTask(prefix) => write!(f, "no task matches `{prefix}`"),
            Self::AmbiguousTask { prefix, matches } => {
                write!(f, "`{prefix}` matches {matches} tasks; use a longer id")
            }
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnknownTask(_) | Self::AmbiguousTask { .. } => None,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PersistenceError> for CliError {
    fn from(value: PersistenceError) -> Self {
        Self::Store(StoreError::Persistence(value))
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Store plus theme preference over one storage backend.
pub struct Session<R: KvRepository> {
    pub store: TaskStore<R>,
    pub theme: ThemeService<R>,
}

impl<R: KvRepository + Copy> Session<R> {
    pub fn open(repo: R, config: StoreConfig) -> Self {
        let theme = ThemeService::new(repo, &config);
        Self {
            store: TaskStore::open(repo, config),
            theme,
        }
    }
}

/// Runs one command, writing human-readable feedback to `out`.
pub fn execute<R: KvRepository>(
    session: &mut Session<R>,
    command: TaskCommand,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let store = &mut session.store;
    match command {
        TaskCommand::Add { priority, text } => match store.add(&text.join(" "), priority) {
            Ok(task) => writeln!(out, "added {}", short_id(&task.id))?,
            Err(err @ StoreError::Persistence(_)) => {
                // The task is kept in memory at the head of the list.
                if let Some(task) = store.tasks().first() {
                    writeln!(out, "added {} (not saved)", short_id(&task.id))?;
                }
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        },
        TaskCommand::List { filter } => {
            if let Some(filter) = filter {
                store.set_filter(filter)?;
            }
        }
        TaskCommand::Toggle { id } => {
            let id = resolve_id(store, &id)?;
            if let Some(completed) = store.toggle(&id)? {
                let state = if completed { "completed" } else { "active" };
                writeln!(out, "{} is now {state}", short_id(&id))?;
            }
        }
        TaskCommand::Edit { id, text } => {
            let id = resolve_id(store, &id)?;
            match store.edit(&id, &text.join(" "))? {
                EditOutcome::Updated => writeln!(out, "updated {}", short_id(&id))?,
                EditOutcome::Removed => writeln!(out, "removed {} (empty text)", short_id(&id))?,
                EditOutcome::NotFound => return Err(CliError::UnknownTask(id)),
            }
        }
        TaskCommand::Rm { id } => {
            let id = resolve_id(store, &id)?;
            if store.remove(&id)? {
                writeln!(out, "removed {}", short_id(&id))?;
            }
        }
        TaskCommand::ClearCompleted => {
            let removed = store.clear_completed()?;
            writeln!(out, "cleared {removed} completed")?;
        }
        TaskCommand::ToggleAll => match store.toggle_all_completed()? {
            Some(true) => writeln!(out, "all tasks completed")?,
            Some(false) => writeln!(out, "all tasks reactivated")?,
            None => writeln!(out, "nothing to toggle")?,
        },
        TaskCommand::BulkComplete { ids } => {
            select_ids(store, &ids)?;
            let changed = store.bulk_complete()?;
            writeln!(out, "completed {changed}")?;
        }
        TaskCommand::BulkDelete { ids } => {
            select_ids(store, &ids)?;
            let removed = store.bulk_delete()?;
            writeln!(out, "deleted {removed}")?;
        }
        TaskCommand::Export { output } => {
            let document = store.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, document)?;
                    writeln!(out, "exported {} to {}", store.len(), path.display())?;
                }
                None => writeln!(out, "{document}")?,
            }
        }
        TaskCommand::Import { path } => {
            let document = std::fs::read_to_string(&path).map_err(|err| match err.kind() {
                io::ErrorKind::InvalidData => CliError::Store(StoreError::ImportFormat(
                    ImportFormatError::InvalidJson(err.to_string()),
                )),
                _ => CliError::Io(err),
            })?;
            let count = store.import_json(&document)?;
            writeln!(out, "imported {count} ({})", items_left(store.remaining_count()))?;
        }
        TaskCommand::Theme { toggle } => {
            let theme = if toggle {
                session.theme.toggle()?
            } else {
                session.theme.load()
            };
            writeln!(out, "theme: {theme}")?;
        }
    }
    Ok(())
}

/// Resolves an exact id or a unique id prefix.
pub fn resolve_id<R: KvRepository>(store: &TaskStore<R>, prefix: &str) -> Result<TaskId, CliError> {
    let prefix = prefix.trim();
    if let Some(task) = store.get(prefix) {
        return Ok(task.id.clone());
    }

    let mut matches = store
        .tasks()
        .iter()
        .filter(|task| !prefix.is_empty() && task.id.starts_with(prefix));
    match (matches.next(), matches.count()) {
        (Some(task), 0) => Ok(task.id.clone()),
        (Some(_), rest) => Err(CliError::AmbiguousTask {
            prefix: prefix.to_string(),
            matches: rest + 1,
        }),
        (None, _) => Err(CliError::UnknownTask(prefix.to_string())),
    }
}

fn select_ids<R: KvRepository>(store: &mut TaskStore<R>, ids: &[String]) -> Result<(), CliError> {
    for raw in ids {
        let id = resolve_id(store, raw)?;
        store.select(&id);
    }
    Ok(())
}
