//! Embedded schema migrations.
//!
//! Each migration is a SQL file compiled into the binary. Applied names are
//! recorded in `_ringline_migrations`; a migration and its tracking row
//! commit together or not at all.

use rusqlite::Connection;
use thiserror::Error;

macro_rules! migration {
    ($name:literal) => {
        ($name, include_str!(concat!("migrations/", $name, ".sql")))
    };
}

/// `(name, sql)` in apply order. Append only.
const MIGRATIONS: &[(&str, &str)] = &[
    migration!("000_businesses"),
    migration!("001_contacts"),
    migration!("002_appointments"),
    migration!("003_inquiries"),
    migration!("004_conversations"),
    migration!("005_calls"),
];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS _ringline_migrations (
    name TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    #[error("failed to read applied migrations: {0}")]
    StateQuery(rusqlite::Error),
}

/// Brings the schema up to date. Returns how many migrations this call
/// applied; zero means the database was already current.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply_all(conn, MIGRATIONS)
}

fn apply_all(conn: &Connection, migrations: &[(&str, &str)]) -> Result<usize, MigrationError> {
    conn.execute_batch(TRACKING_TABLE)
        .map_err(|source| MigrationError::ExecutionFailed {
            name: "_ringline_migrations".to_string(),
            source,
        })?;

    let mut applied = 0;
    for &(name, sql) in migrations {
        if is_applied(conn, name)? {
            tracing::debug!(migration = name, "migration already applied");
            continue;
        }
        apply(conn, name, sql).map_err(|source| MigrationError::ExecutionFailed {
            name: name.to_string(),
            source,
        })?;
        tracing::info!(migration = name, "applied migration");
        applied += 1;
    }
    Ok(applied)
}

fn is_applied(conn: &Connection, name: &str) -> Result<bool, MigrationError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM _ringline_migrations WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )
    .map_err(MigrationError::StateQuery)
}

fn apply(conn: &Connection, name: &str, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute("INSERT INTO _ringline_migrations (name) VALUES (?1)", [name])?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn fresh_database_gets_every_table_once() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&conn).unwrap(), 0);

        for table in [
            "businesses",
            "contacts",
            "appointments",
            "inquiries",
            "conversations",
            "messages",
            "calls",
        ] {
            assert!(table_exists(&conn, table), "{table} missing");
        }
    }

    #[test]
    fn appointments_require_an_existing_business() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();

        let orphan = conn.execute(
            "INSERT INTO appointments (id, business_id, scheduled_at, confirmation_code)
             VALUES ('a1', 'no-such-business', '2026-10-20T14:00:00Z', 'APT-X')",
            [],
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn failed_migration_leaves_no_partial_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let broken = [(
            "900_half_applied",
            "CREATE TABLE half_applied (id INTEGER PRIMARY KEY);
             INSERT INTO missing_table VALUES (1);",
        )];

        match apply_all(&conn, &broken) {
            Err(MigrationError::ExecutionFailed { name, .. }) => assert_eq!(name, "900_half_applied"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!table_exists(&conn, "half_applied"));
        assert!(!is_applied(&conn, "900_half_applied").unwrap());
    }
}
