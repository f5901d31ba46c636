use tasklist_core::db::{open_db, open_db_in_memory};
use tasklist_core::{KvRepository, RepoError, SqliteKvRepository};

#[test]
fn sqlite_repo_get_set_remove_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKvRepository::new(&conn);

    assert!(repo.get("todos").unwrap().is_none());
    repo.set("todos", "[]").unwrap();
    repo.set("todos", r#"[{"id":"1"}]"#).unwrap();
    assert_eq!(repo.get("todos").unwrap().as_deref(), Some(r#"[{"id":"1"}]"#));

    repo.remove("todos").unwrap();
    repo.remove("todos").unwrap();
    assert!(repo.get("todos").unwrap().is_none());
}

#[test]
fn sqlite_repo_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.sqlite3");

    {
        let conn = open_db(&path).unwrap();
        SqliteKvRepository::new(&conn).set("theme", "light").unwrap();
    }

    let conn = open_db(&path).unwrap();
    let repo = SqliteKvRepository::new(&conn);
    assert_eq!(repo.get("theme").unwrap().as_deref(), Some("light"));
}

#[test]
fn sqlite_repo_quota_rejects_growth_and_keeps_previous_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKvRepository::new(&conn).with_quota(Some(16));

    repo.set("todos", "[1,2,3]").unwrap();
    let err = repo.set("todos", "[1,2,3,4,5,6,7,8,9]").unwrap_err();
    match err {
        RepoError::QuotaExceeded {
            key,
            required_bytes,
            quota_bytes,
        } => {
            assert_eq!(key, "todos");
            assert_eq!(required_bytes, 5 + 19);
            assert_eq!(quota_bytes, 16);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.get("todos").unwrap().as_deref(), Some("[1,2,3]"));
}

#[test]
fn sqlite_repo_quota_counts_multibyte_text_in_bytes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKvRepository::new(&conn).with_quota(Some(11));

    repo.set("a", "ééé").unwrap();
    let err = repo.set("b", "éé").unwrap_err();
    assert!(matches!(
        err,
        RepoError::QuotaExceeded {
            required_bytes: 12,
            ..
        }
    ));
}
