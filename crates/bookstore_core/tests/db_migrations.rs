use bookstore_core::db::migrations::{current_version, latest_version};
use bookstore_core::db::{open_db, open_db_in_memory, DbError};

const TABLES: [&str; 5] = ["books", "members", "loans", "orders", "order_items"];

fn tables(conn: &rusqlite::Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name;")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn in_memory_database_has_full_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_version(&conn).unwrap(), latest_version());
    let names = tables(&conn);
    for table in TABLES {
        assert!(names.iter().any(|name| name == table), "missing {table}");
    }
}

#[test]
fn reopening_a_file_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookstore.db");

    {
        let conn = open_db(&path).unwrap();
        conn.execute(
            "INSERT INTO members (name, email, membership_type, join_date)
             VALUES ('Kim', 'kim@example.com', 'REGULAR', 0);",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(current_version(&conn).unwrap(), latest_version());
    let members: i64 = conn
        .query_row("SELECT COUNT(*) FROM members;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(members, 1);
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from-the-future.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .pragma_update(None, "user_version", latest_version() + 7)
        .unwrap();

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, latest_version() + 7);
            assert_eq!(supported, latest_version());
        }
        other => panic!("expected SchemaTooNew, got {other}"),
    }
}

#[test]
fn file_database_creates_parent_dirs_and_uses_wal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store").join("bookstore.db");

    let conn = open_db(&path).unwrap();
    assert!(path.exists());
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_ascii_lowercase(), "wal");
}

#[test]
fn loans_require_existing_member_and_book() {
    let conn = open_db_in_memory().unwrap();

    let err = conn
        .execute(
            "INSERT INTO loans (member_id, book_id, loan_date, due_date) VALUES (41, 42, 0, 1);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}
