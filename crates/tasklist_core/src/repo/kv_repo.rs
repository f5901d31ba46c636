//! Durable key/value storage contracts and implementations.
//!
//! # Responsibility
//! - Provide the string key/value surface the store persists through.
//! - Keep SQL details inside the persistence boundary.
//! - Reproduce local-storage quota failures with an optional byte budget.
//!
//! # Invariants
//! - `set` overwrites the full value for a key; there are no partial writes.
//! - A write rejected by the quota leaves the previous value untouched.
//! - Quota accounting counts UTF-8 bytes of every key and value.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-layer failure.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Writing would grow storage beyond its configured budget.
    QuotaExceeded {
        key: String,
        required_bytes: usize,
        quota_bytes: usize,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded {
                key,
                required_bytes,
                quota_bytes,
            } => write!(
                f,
                "storage quota exceeded writing `{key}`: {required_bytes} bytes needed, {quota_bytes} allowed"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for durable string key/value storage.
pub trait KvRepository {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Removes `key`; absent keys are not an error.
    fn remove(&self, key: &str) -> RepoResult<()>;
}

impl<R: KvRepository + ?Sized> KvRepository for &R {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> RepoResult<()> {
        (**self).remove(key)
    }
}

/// SQLite-backed key/value repository over the `kv_entries` table.
pub struct SqliteKvRepository<'conn> {
    conn: &'conn Connection,
    quota_bytes: Option<usize>,
}

impl<'conn> SqliteKvRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            quota_bytes: None,
        }
    }

    /// Caps total stored bytes; `None` removes the cap.
    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    fn bytes_excluding(&self, key: &str) -> RepoResult<usize> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
             FROM kv_entries
             WHERE key != ?1;",
            [key],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(used).unwrap_or(0))
    }
}

impl KvRepository for SqliteKvRepository<'_> {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        if let Some(quota_bytes) = self.quota_bytes {
            let required_bytes = self.bytes_excluding(key)? + key.len() + value.len();
            check_quota(key, required_bytes, quota_bytes)?;
        }

        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Process-local key/value repository.
///
/// Single-threaded by construction; the quota can be changed at runtime to
/// simulate storage filling up mid-session.
#[derive(Debug, Default)]
pub struct MemoryKvRepository {
    entries: RefCell<BTreeMap<String, String>>,
    quota_bytes: Cell<Option<usize>>,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: Option<usize>) -> Self {
        let repo = Self::default();
        repo.set_quota(quota_bytes);
        repo
    }

    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        self.quota_bytes.set(quota_bytes);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KvRepository for MemoryKvRepository {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        if let Some(quota_bytes) = self.quota_bytes.get() {
            let others = self
                .entries
                .borrow()
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| existing.len() + stored.len())
                .sum::<usize>();
            check_quota(key, others + key.len() + value.len(), quota_bytes)?;
        }

        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

fn check_quota(key: &str, required_bytes: usize, quota_bytes: usize) -> RepoResult<()> {
    if required_bytes > quota_bytes {
        return Err(RepoError::QuotaExceeded {
            key: key.to_string(),
            required_bytes,
            quota_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{KvRepository, MemoryKvRepository, RepoError};

    #[test]
    fn memory_repo_overwrites_and_removes() {
        let repo = MemoryKvRepository::new();
        repo.set("k", "one").unwrap();
        repo.set("k", "two").unwrap();
        assert_eq!(repo.get("k").unwrap().as_deref(), Some("two"));

        repo.remove("k").unwrap();
        repo.remove("k").unwrap();
        assert!(repo.get("k").unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[test]
    fn memory_repo_quota_counts_other_keys_but_not_replaced_value() {
        let repo = MemoryKvRepository::with_quota(Some(10));
        repo.set("a", "1234").unwrap();
        repo.set("a", "12345678").unwrap();

        let err = repo.set("b", "xyz").unwrap_err();
        assert!(matches!(
            err,
            RepoError::QuotaExceeded {
                required_bytes: 13,
                quota_bytes: 10,
                ..
            }
        ));
        assert_eq!(repo.get("a").unwrap().as_deref(), Some("12345678"));
        assert!(repo.get("b").unwrap().is_none());
    }
}
