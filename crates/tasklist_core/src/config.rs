//! Store configuration and environment overrides.
//!
//! # Responsibility
//! - Name the storage keys the store and theme service use.
//! - Hold the policy switches for behavior that varies between clients.
//!
//! # Invariants
//! - `StoreConfig::default()` matches the historical key layout.
//! - Unparseable environment values are ignored, never fatal.

use log::warn;
use std::env;
use std::str::FromStr;

pub const DEFAULT_TASKS_KEY: &str = "todos";
pub const DEFAULT_THEME_KEY: &str = "theme";
pub const DEFAULT_FILTER_KEY: &str = "todo-filter";

pub const ENV_PERSIST_FILTER: &str = "TASKLIST_PERSIST_FILTER";
pub const ENV_EMPTY_EDIT: &str = "TASKLIST_EMPTY_EDIT";
pub const ENV_QUOTA_BYTES: &str = "TASKLIST_QUOTA_BYTES";

/// What an edit to blank text does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyEditPolicy {
    /// Remove the task.
    #[default]
    Delete,
    /// Keep the task and report a validation error.
    Reject,
}

impl FromStr for EmptyEditPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unsupported empty-edit policy `{other}`; expected delete|reject"
            )),
        }
    }
}

/// Settings for one `TaskStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key holding the JSON task array.
    pub tasks_key: String,
    /// Key holding the theme preference string.
    pub theme_key: String,
    /// Key holding the active filter when `persist_filter` is on.
    pub filter_key: String,
    /// Whether the active filter survives reloads.
    pub persist_filter: bool,
    pub empty_edit_policy: EmptyEditPolicy,
    /// Storage budget applied by repositories built from this config.
    pub quota_bytes: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tasks_key: DEFAULT_TASKS_KEY.to_string(),
            theme_key: DEFAULT_THEME_KEY.to_string(),
            filter_key: DEFAULT_FILTER_KEY.to_string(),
            persist_filter: false,
            empty_edit_policy: EmptyEditPolicy::default(),
            quota_bytes: None,
        }
    }
}

impl StoreConfig {
    /// Defaults with `TASKLIST_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|name| env::var(name).ok());
        config
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_PERSIST_FILTER) {
            match parse_flag(&value) {
                Some(flag) => self.persist_filter = flag,
                None => warn!("event=config_env module=config status=ignored var={ENV_PERSIST_FILTER}"),
            }
        }
        if let Some(value) = lookup(ENV_EMPTY_EDIT) {
            match value.parse() {
                Ok(policy) => self.empty_edit_policy = policy,
                Err(err) => {
                    warn!("event=config_env module=config status=ignored var={ENV_EMPTY_EDIT} error={err}")
                }
            }
        }
        if let Some(value) = lookup(ENV_QUOTA_BYTES) {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                self.quota_bytes = None;
            } else {
                match trimmed.parse::<usize>() {
                    Ok(bytes) => self.quota_bytes = Some(bytes),
                    Err(_) => warn!("event=config_env module=config status=ignored var={ENV_QUOTA_BYTES}"),
                }
            }
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
