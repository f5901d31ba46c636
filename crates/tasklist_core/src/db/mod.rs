//! SQLite file that backs the key/value store.
//!
//! Connections handed out by `open_db*` are migrated to the schema version
//! this build knows. The version lives in `PRAGMA user_version`; a file
//! stamped by a newer build is refused rather than downgraded.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open, migrate or query the storage file.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "storage file uses schema v{found}; this build reads up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Schema version stamped on `conn`; `0` for a fresh file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{schema_version, DbError};
    use rusqlite::Connection;
    use std::error::Error;

    #[test]
    fn fresh_connection_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn schema_too_new_names_both_versions() {
        let err = DbError::SchemaTooNew {
            found: 7,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "storage file uses schema v7; this build reads up to v1"
        );
        assert!(err.source().is_none());
    }
}
