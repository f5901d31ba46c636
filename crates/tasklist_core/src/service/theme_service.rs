//! Theme preference persistence.
//!
//! # Invariants
//! - Only the light theme is stored; the default theme is the absent key.
//! - Unknown stored values read as the default theme.

use crate::config::StoreConfig;
use crate::repo::kv_repo::KvRepository;
use crate::service::task_store::PersistenceError;
use log::{info, warn};
use std::fmt::{Display, Formatter};

const LIGHT_VALUE: &str = "light";

/// Color theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dark => f.write_str("dark"),
            Self::Light => f.write_str(LIGHT_VALUE),
        }
    }
}

/// Reads and writes the theme key.
pub struct ThemeService<R: KvRepository> {
    repo: R,
    key: String,
}

impl<R: KvRepository> ThemeService<R> {
    pub fn new(repo: R, config: &StoreConfig) -> Self {
        Self {
            repo,
            key: config.theme_key.clone(),
        }
    }

    /// Current preference; read failures fall back to the default.
    pub fn load(&self) -> Theme {
        match self.repo.get(&self.key) {
            Ok(Some(value)) if value.trim() == LIGHT_VALUE => Theme::Light,
            Ok(_) => Theme::Dark,
            Err(err) => {
                warn!("event=theme_load module=theme status=error error={err}");
                Theme::default()
            }
        }
    }

    pub fn save(&self, theme: Theme) -> Result<(), PersistenceError> {
        match theme {
            Theme::Light => self.repo.set(&self.key, LIGHT_VALUE)?,
            Theme::Dark => self.repo.remove(&self.key)?,
        }
        info!("event=theme_save module=theme status=ok theme={theme}");
        Ok(())
    }

    /// Flips and stores the preference, returning the new theme.
    pub fn toggle(&self) -> Result<Theme, PersistenceError> {
        let next = self.load().toggled();
        self.save(next)?;
        Ok(next)
    }
}
