use pidmediator_core::db::migrations::latest_version;
use pidmediator_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection, ErrorCode};

fn insert_object(conn: &Connection, uuid: &str) {
    conn.execute(
        "INSERT INTO objects (uuid, kind, name) VALUES (?1, 'item', ?1);",
        [uuid],
    )
    .unwrap();
}

fn insert_identifier(
    conn: &Connection,
    uuid: &str,
    position: i64,
    value: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO object_identifiers (object_uuid, position, scheme, value, status)
         VALUES (?1, ?2, 'handle', ?3, 'reserved');",
        params![uuid, position, value],
    )
}

fn is_constraint_violation(result: rusqlite::Result<usize>) -> bool {
    matches!(
        result,
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation
    )
}

fn user_tables(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name;")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

#[test]
fn fresh_store_carries_object_and_identifier_tables() {
    let conn = open_db_in_memory().unwrap();

    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
    assert_eq!(user_tables(&conn), vec!["object_identifiers", "objects"]);
}

#[test]
fn identifier_value_belongs_to_one_object_only() {
    let conn = open_db_in_memory().unwrap();
    insert_object(&conn, "a");
    insert_object(&conn, "b");

    insert_identifier(&conn, "a", 0, "123456789/1").unwrap();
    assert!(is_constraint_violation(insert_identifier(
        &conn,
        "b",
        0,
        "123456789/1"
    )));
    assert!(is_constraint_violation(insert_identifier(
        &conn,
        "a",
        1,
        "123456789/1"
    )));
}

#[test]
fn identifier_positions_are_unique_per_object_and_order_reads() {
    let conn = open_db_in_memory().unwrap();
    insert_object(&conn, "a");
    insert_object(&conn, "b");

    insert_identifier(&conn, "a", 1, "1/second").unwrap();
    insert_identifier(&conn, "a", 0, "1/first").unwrap();
    insert_identifier(&conn, "b", 0, "1/other").unwrap();
    assert!(is_constraint_violation(insert_identifier(
        &conn, "a", 1, "1/clash"
    )));

    let mut stmt = conn
        .prepare("SELECT value FROM object_identifiers WHERE object_uuid = 'a' ORDER BY position;")
        .unwrap();
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(values, vec!["1/first", "1/second"]);
}

#[test]
fn deleting_an_object_cascades_to_its_identifiers() {
    let conn = open_db_in_memory().unwrap();
    insert_object(&conn, "a");
    insert_object(&conn, "b");
    insert_identifier(&conn, "a", 0, "1/a0").unwrap();
    insert_identifier(&conn, "a", 1, "1/a1").unwrap();
    insert_identifier(&conn, "b", 0, "1/b0").unwrap();

    conn.execute("DELETE FROM objects WHERE uuid = 'a';", [])
        .unwrap();

    let remaining: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT value FROM object_identifiers ORDER BY value;")
            .unwrap();
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        rows
    };
    assert_eq!(remaining, vec!["1/b0"]);
}

#[test]
fn orphan_identifiers_and_unknown_enums_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    assert!(is_constraint_violation(insert_identifier(
        &conn, "missing", 0, "1/1"
    )));

    insert_object(&conn, "a");
    let bad_status = conn.execute(
        "INSERT INTO object_identifiers (object_uuid, position, scheme, value, status)
         VALUES ('a', 0, 'handle', '1/1', 'minted');",
        [],
    );
    assert!(is_constraint_violation(bad_status));

    let bad_kind = conn.execute(
        "INSERT INTO objects (uuid, kind, name) VALUES ('c', 'bitstream', 'c');",
        [],
    );
    assert!(is_constraint_violation(bad_kind));
}

#[test]
fn reopening_a_store_file_keeps_rows_and_skips_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("objects.db");

    {
        let conn = open_db(&path).unwrap();
        insert_object(&conn, "a");
        insert_identifier(&conn, "a", 0, "1/kept").unwrap();
    }

    let conn = open_db(&path).unwrap();
    let value: String = conn
        .query_row(
            "SELECT value FROM object_identifiers WHERE object_uuid = 'a';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, "1/kept");
}

#[test]
fn store_written_by_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 42;")
        .unwrap();

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::SchemaTooNew { found: 42, supported } if supported == latest_version()
    ));
    assert!(err.to_string().contains("newer than this build supports"));
}
