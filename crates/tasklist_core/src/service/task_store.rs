//! Task store: single source of truth for tasks.
//!
//! # Responsibility
//! - Own the task collection, the active filter and the bulk selection.
//! - Write the full collection through to durable storage after every
//!   mutation, and rehydrate it on open.
//! - Derive filtered views and counts for the rendering layer.
//! - Notify subscribers after each state change.
//!
//! # Invariants
//! - Task ids are unique; new tasks are prepended (newest first).
//! - Every selected id refers to a task in the collection.
//! - A failed write never rolls back in-memory state; the store stays
//!   usable and is marked dirty until the next successful write.
//! - Loading never fails: absent or malformed data yields an empty list.

use crate::config::{EmptyEditPolicy, StoreConfig};
use crate::model::task::{normalize_text, Filter, Priority, Task, TaskId, TaskValidationError};
use crate::repo::kv_repo::{KvRepository, RepoError};
use crate::repo::task_snapshot::{decode_tasks, encode_tasks, encode_tasks_pretty, ImportFormatError};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::slice;

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable write or read failure. In-memory state remains authoritative.
#[derive(Debug)]
pub enum PersistenceError {
    Storage(RepoError),
    Serialize(serde_json::Error),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "could not save tasks: {err}"),
            Self::Serialize(err) => write!(f, "could not serialize tasks: {err}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<RepoError> for PersistenceError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Store-level error surfaced to callers as a user-visible notice.
#[derive(Debug)]
pub enum StoreError {
    /// Input rejected; nothing changed.
    Validation(TaskValidationError),
    /// State changed in memory but could not be written.
    Persistence(PersistenceError),
    /// Imported document has the wrong shape; nothing changed.
    ImportFormat(ImportFormatError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::ImportFormat(err) => write!(f, "import failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::ImportFormat(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PersistenceError> for StoreError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<ImportFormatError> for StoreError {
    fn from(value: ImportFormatError) -> Self {
        Self::ImportFormat(value)
    }
}

/// Post-mutation notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded { count: usize },
    Added { id: TaskId },
    Toggled { id: TaskId, completed: bool },
    Edited { id: TaskId },
    Removed { ids: Vec<TaskId> },
    AllToggled { completed: bool },
    Completed { ids: Vec<TaskId> },
    FilterChanged { filter: Filter },
    SelectionChanged { selected: usize },
    Imported { count: usize },
}

/// Result of `TaskStore::edit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Updated,
    /// Blank text under `EmptyEditPolicy::Delete`.
    Removed,
    NotFound,
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Task collection bound to one durable storage backend.
pub struct TaskStore<R: KvRepository> {
    repo: R,
    config: StoreConfig,
    tasks: Vec<Task>,
    filter: Filter,
    selection: BTreeSet<TaskId>,
    dirty: bool,
    listeners: Vec<Listener>,
}

impl<R: KvRepository> TaskStore<R> {
    /// Creates a store and rehydrates it from `repo`.
    ///
    /// Never fails; unreadable data is logged and treated as empty.
    pub fn open(repo: R, config: StoreConfig) -> Self {
        let mut store = Self {
            repo,
            config,
            tasks: Vec::new(),
            filter: Filter::default(),
            selection: BTreeSet::new(),
            dirty: false,
            listeners: Vec::new(),
        };
        store.load();
        store
    }

    /// Replaces in-memory tasks with the persisted collection.
    ///
    /// Selection entries whose task vanished are dropped. The filter is
    /// restored only when filter persistence is enabled.
    pub fn load(&mut self) {
        self.tasks = read_tasks(&self.repo, &self.config.tasks_key);
        let tasks = &self.tasks;
        self.selection
            .retain(|id| tasks.iter().any(|task| &task.id == id));
        if self.config.persist_filter {
            self.filter = read_filter(&self.repo, &self.config.filter_key);
        }
        self.dirty = false;
        info!(
            "event=store_load module=store status=ok count={} filter={}",
            self.tasks.len(),
            self.filter
        );
        self.notify(&StoreEvent::Loaded {
            count: self.tasks.len(),
        });
    }

    /// Overwrites the persisted collection with the in-memory one.
    ///
    /// Also rewrites the filter when filter persistence is enabled, so a
    /// filter change that failed to save is recovered here.
    pub fn save(&mut self) -> Result<(), PersistenceError> {
        let result = encode_tasks(&self.tasks)
            .map_err(PersistenceError::Serialize)
            .and_then(|payload| {
                self.repo
                    .set(&self.config.tasks_key, &payload)
                    .map_err(PersistenceError::from)
            })
            .and_then(|()| self.write_filter());

        match &result {
            Ok(()) => {
                self.dirty = false;
                debug!(
                    "event=store_save module=store status=ok count={}",
                    self.tasks.len()
                );
            }
            Err(err) => {
                self.dirty = true;
                error!(
                    "event=store_save module=store status=error count={} error={}",
                    self.tasks.len(),
                    err
                );
            }
        }
        result
    }

    /// Prepends a new active task.
    ///
    /// # Errors
    /// - `Validation` when `text` trims to empty; nothing changes.
    /// - `Persistence` when the write fails. The task stays in memory at
    ///   the head of `tasks()` and the store is dirty.
    pub fn add(&mut self, text: &str, priority: Option<Priority>) -> StoreResult<Task> {
        let task = match Task::new(text, priority.unwrap_or_default()) {
            Ok(task) => task,
            Err(err) => {
                warn!("event=task_add module=store status=rejected reason={err}");
                return Err(err.into());
            }
        };
        self.tasks.insert(0, task.clone());
        info!(
            "event=task_add module=store status=ok priority={} total={}",
            task.priority,
            self.tasks.len()
        );
        if let Err(err) = self.commit(StoreEvent::Added {
            id: task.id.clone(),
        }) {
            warn!("event=task_add module=store status=unsaved id={}", task.id);
            return Err(err);
        }
        Ok(task)
    }

    /// Flips completion of one task.
    ///
    /// Returns the new state, or `None` when `id` is unknown.
    pub fn toggle(&mut self, id: &str) -> StoreResult<Option<bool>> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        let completed = task.toggle();
        self.commit(StoreEvent::Toggled {
            id: id.to_string(),
            completed,
        })?;
        Ok(Some(completed))
    }

    /// Replaces the text of one task.
    ///
    /// Blank `new_text` follows `StoreConfig::empty_edit_policy`.
    pub fn edit(&mut self, id: &str, new_text: &str) -> StoreResult<EditOutcome> {
        let Some(index) = self.position(id) else {
            return Ok(EditOutcome::NotFound);
        };

        match normalize_text(new_text) {
            Some(text) => {
                self.tasks[index].set_text(text);
                self.commit(StoreEvent::Edited { id: id.to_string() })?;
                Ok(EditOutcome::Updated)
            }
            None => match self.config.empty_edit_policy {
                EmptyEditPolicy::Delete => {
                    let removed = self.remove_at(index);
                    info!("event=task_edit module=store status=ok outcome=removed");
                    self.commit(StoreEvent::Removed {
                        ids: vec![removed.id],
                    })?;
                    Ok(EditOutcome::Removed)
                }
                EmptyEditPolicy::Reject => {
                    warn!("event=task_edit module=store status=rejected reason=empty_text");
                    Err(TaskValidationError::EmptyText.into())
                }
            },
        }
    }

    /// Deletes one task and its selection entry.
    ///
    /// Returns `false` when `id` is unknown.
    pub fn remove(&mut self, id: &str) -> StoreResult<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let removed = self.remove_at(index);
        self.commit(StoreEvent::Removed {
            ids: vec![removed.id],
        })?;
        Ok(true)
    }

    /// Deletes every completed task; returns how many were removed.
    pub fn clear_completed(&mut self) -> StoreResult<usize> {
        let ids = self
            .tasks
            .iter()
            .filter(|task| task.completed)
            .map(|task| task.id.clone())
            .collect::<Vec<_>>();
        if ids.is_empty() {
            return Ok(0);
        }

        self.tasks.retain(Task::is_active);
        for id in &ids {
            self.selection.remove(id);
        }
        info!(
            "event=clear_completed module=store status=ok removed={} total={}",
            ids.len(),
            self.tasks.len()
        );
        let count = ids.len();
        self.commit(StoreEvent::Removed { ids })?;
        Ok(count)
    }

    /// Completes every task if any is active; otherwise reactivates all.
    ///
    /// Returns the applied state, or `None` for an empty collection.
    pub fn toggle_all_completed(&mut self) -> StoreResult<Option<bool>> {
        if self.tasks.is_empty() {
            return Ok(None);
        }

        let completed = self.tasks.iter().any(Task::is_active);
        for task in self.tasks.iter_mut().filter(|task| task.completed != completed) {
            task.set_completed(completed);
        }
        self.commit(StoreEvent::AllToggled { completed })?;
        Ok(Some(completed))
    }

    /// Changes the view filter.
    ///
    /// Writes only when filter persistence is enabled. A failed write keeps
    /// the new filter and marks the store dirty.
    pub fn set_filter(&mut self, filter: Filter) -> StoreResult<()> {
        self.filter = filter;
        self.notify(&StoreEvent::FilterChanged { filter });
        if let Err(err) = self.write_filter() {
            self.dirty = true;
            error!("event=filter_save module=store status=error filter={filter} error={err}");
            return Err(err.into());
        }
        Ok(())
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Tasks matching the active filter, in collection order.
    pub fn filtered_view(&self) -> FilteredView<'_> {
        self.view(self.filter)
    }

    /// Tasks matching `filter`, independent of the active filter.
    pub fn view(&self, filter: Filter) -> FilteredView<'_> {
        FilteredView {
            tasks: &self.tasks,
            filter,
        }
    }

    /// Number of tasks not yet completed.
    pub fn remaining_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.is_active()).count()
    }

    /// Marks one existing task for bulk operations.
    pub fn select(&mut self, id: &str) -> bool {
        if self.position(id).is_none() || !self.selection.insert(id.to_string()) {
            return false;
        }
        self.selection_changed();
        true
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        if !self.selection.remove(id) {
            return false;
        }
        self.selection_changed();
        true
    }

    /// Selects every task in the current filtered view.
    pub fn select_all(&mut self) -> usize {
        let ids = self
            .filtered_view()
            .iter()
            .map(|task| task.id.clone())
            .collect::<Vec<_>>();
        self.selection.extend(ids);
        self.selection_changed();
        self.selection.len()
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.selection_changed();
    }

    pub fn selection(&self) -> &BTreeSet<TaskId> {
        &self.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Completes every selected task, writes once, clears the selection.
    ///
    /// Returns how many tasks changed state.
    pub fn bulk_complete(&mut self) -> StoreResult<usize> {
        let selection = std::mem::take(&mut self.selection);
        let mut ids = Vec::new();
        for task in self
            .tasks
            .iter_mut()
            .filter(|task| task.is_active() && selection.contains(&task.id))
        {
            task.set_completed(true);
            ids.push(task.id.clone());
        }
        if !selection.is_empty() {
            self.selection_changed();
        }
        if ids.is_empty() {
            return Ok(0);
        }

        info!(
            "event=bulk_complete module=store status=ok changed={}",
            ids.len()
        );
        let count = ids.len();
        self.commit(StoreEvent::Completed { ids })?;
        Ok(count)
    }

    /// Deletes every selected task, writes once, clears the selection.
    ///
    /// Returns how many tasks were removed.
    pub fn bulk_delete(&mut self) -> StoreResult<usize> {
        let selection = std::mem::take(&mut self.selection);
        if selection.is_empty() {
            return Ok(0);
        }
        self.selection_changed();

        let before = self.tasks.len();
        self.tasks.retain(|task| !selection.contains(&task.id));
        let count = before - self.tasks.len();
        info!(
            "event=bulk_delete module=store status=ok removed={count} total={}",
            self.tasks.len()
        );
        self.commit(StoreEvent::Removed {
            ids: selection.into_iter().collect(),
        })?;
        Ok(count)
    }

    /// Serializes the full collection as a pretty JSON array.
    pub fn export_json(&self) -> StoreResult<String> {
        encode_tasks_pretty(&self.tasks)
            .map_err(|err| PersistenceError::Serialize(err).into())
    }

    /// Replaces the collection with the tasks in `document`.
    ///
    /// # Errors
    /// - `ImportFormat` when `document` is not a JSON array; nothing changes.
    /// - `Persistence` when the write fails; imported tasks stay in memory.
    pub fn import_json(&mut self, document: &str) -> StoreResult<usize> {
        let decoded = match decode_tasks(document) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("event=store_import module=store status=rejected error={err}");
                return Err(err.into());
            }
        };

        self.tasks = decoded.tasks;
        let tasks = &self.tasks;
        self.selection
            .retain(|id| tasks.iter().any(|task| &task.id == id));
        info!(
            "event=store_import module=store status=ok count={} skipped={}",
            self.tasks.len(),
            decoded.skipped
        );
        let count = self.tasks.len();
        self.commit(StoreEvent::Imported { count })?;
        Ok(count)
    }

    /// Registers a callback invoked after every state change.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Full collection, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether the latest write failed and memory is ahead of storage.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn write_filter(&self) -> Result<(), PersistenceError> {
        if !self.config.persist_filter {
            return Ok(());
        }
        self.repo
            .set(&self.config.filter_key, self.filter.as_str())
            .map_err(PersistenceError::from)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn remove_at(&mut self, index: usize) -> Task {
        let removed = self.tasks.remove(index);
        self.selection.remove(&removed.id);
        removed
    }

    fn commit(&mut self, event: StoreEvent) -> StoreResult<()> {
        let saved = self.save();
        self.notify(&event);
        saved.map_err(StoreError::from)
    }

    fn selection_changed(&mut self) {
        let selected = self.selection.len();
        self.notify(&StoreEvent::SelectionChanged { selected });
    }

    fn notify(&mut self, event: &StoreEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

/// Borrowed, restartable view over the tasks matching one filter.
#[derive(Debug, Clone, Copy)]
pub struct FilteredView<'a> {
    tasks: &'a [Task],
    filter: Filter,
}

impl<'a> FilteredView<'a> {
    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Starts a fresh pass over the view.
    pub fn iter(&self) -> FilteredIter<'a> {
        FilteredIter {
            inner: self.tasks.iter(),
            filter: self.filter,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.iter().map(|task| task.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for FilteredView<'a> {
    type Item = &'a Task;
    type IntoIter = FilteredIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &FilteredView<'a> {
    type Item = &'a Task;
    type IntoIter = FilteredIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator produced by `FilteredView::iter`.
#[derive(Debug, Clone)]
pub struct FilteredIter<'a> {
    inner: slice::Iter<'a, Task>,
    filter: Filter,
}

impl<'a> Iterator for FilteredIter<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner.find(|task| filter.matches(task))
    }
}

fn read_tasks<R: KvRepository>(repo: &R, key: &str) -> Vec<Task> {
    let raw = match repo.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            error!("event=store_load module=store status=error stage=read error={err}");
            return Vec::new();
        }
    };

    match decode_tasks(&raw) {
        Ok(decoded) => {
            if decoded.skipped > 0 {
                warn!(
                    "event=store_load module=store status=partial skipped={}",
                    decoded.skipped
                );
            }
            decoded.tasks
        }
        Err(err) => {
            error!("event=store_load module=store status=error stage=decode error={err}");
            Vec::new()
        }
    }
}

fn read_filter<R: KvRepository>(repo: &R, key: &str) -> Filter {
    match repo.get(key) {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|err| {
            warn!("event=store_load module=store status=ignored stage=filter error={err}");
            Filter::default()
        }),
        Ok(None) => Filter::default(),
        Err(err) => {
            error!("event=store_load module=store status=error stage=filter error={err}");
            Filter::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EditOutcome, StoreError, StoreEvent, TaskStore};
    use crate::config::StoreConfig;
    use crate::model::task::{Filter, Priority};
    use crate::repo::kv_repo::{KvRepository, MemoryKvRepository};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn seeded(repo: &MemoryKvRepository) -> TaskStore<&MemoryKvRepository> {
        repo.set(
            "todos",
            r#"[{"id":"1","text":"buy milk","completed":false,"createdAt":1}]"#,
        )
        .unwrap();
        TaskStore::open(repo, StoreConfig::default())
    }

    #[test]
    fn toggle_moves_task_between_views() {
        let repo = MemoryKvRepository::new();
        let mut store = seeded(&repo);

        assert_eq!(store.toggle("1").unwrap(), Some(true));
        assert_eq!(store.remaining_count(), 0);
        assert!(store.view(Filter::Active).is_empty());
        assert_eq!(store.view(Filter::Completed).ids(), vec!["1"]);
    }

    #[test]
    fn toggle_unknown_id_is_a_no_op() {
        let repo = MemoryKvRepository::new();
        let mut store = seeded(&repo);
        assert_eq!(store.toggle("missing").unwrap(), None);
        assert_eq!(store.remaining_count(), 1);
    }

    #[test]
    fn filtered_view_is_restartable() {
        let repo = MemoryKvRepository::new();
        let mut store = seeded(&repo);
        store.add("second", Some(Priority::High)).unwrap();

        let view = store.filtered_view();
        let first_pass = view.iter().count();
        let second_pass = view.into_iter().count();
        assert_eq!(first_pass, 2);
        assert_eq!(second_pass, 2);
    }

    #[test]
    fn subscribers_see_events_in_order() {
        let repo = MemoryKvRepository::new();
        let mut store = seeded(&repo);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store.toggle("1").unwrap();
        store.set_filter(Filter::Completed).unwrap();
        store.edit("1", "oat milk").unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                StoreEvent::Toggled {
                    id: "1".to_string(),
                    completed: true
                },
                StoreEvent::FilterChanged {
                    filter: Filter::Completed
                },
                StoreEvent::Edited {
                    id: "1".to_string()
                },
            ]
        );
    }

    #[test]
    fn edit_of_unknown_id_reports_not_found() {
        let repo = MemoryKvRepository::new();
        let mut store = seeded(&repo);
        assert_eq!(store.edit("nope", "x").unwrap(), EditOutcome::NotFound);
    }

    #[test]
    fn add_blank_text_is_a_validation_error() {
        let repo = MemoryKvRepository::new();
        let mut store = seeded(&repo);
        let err = store.add("   ", None).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.len(), 1);
    }
}
