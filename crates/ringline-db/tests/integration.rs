use ringline_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn file_backed_pool_persists_schema() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("ringline.db");
    let path = path.to_str().expect("temp path should be utf-8");

    {
        let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to create pool");
        let conn = pool.get().expect("failed to get connection");
        let applied = run_migrations(&conn).expect("failed to run migrations");
        assert!(applied > 0);

        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .expect("failed to read journal mode");
        assert_eq!(mode, "wal");
    }

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to reopen pool");
    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to rerun migrations");
    assert_eq!(applied, 0, "reopened database should already be migrated");

    let mut stmt = conn
        .prepare("SELECT name FROM _ringline_migrations ORDER BY name")
        .expect("failed to prepare migration listing");
    let names: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to list migrations")
        .map(|r| r.expect("failed to read migration name"))
        .collect();
    assert_eq!(names.first().map(String::as_str), Some("000_businesses"));
    assert_eq!(names.last().map(String::as_str), Some("005_calls"));
}
