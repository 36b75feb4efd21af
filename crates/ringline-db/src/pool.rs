//! SQLite connection pool.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Pool and per-connection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on open connections. Each live call holds one only for
    /// the duration of a single query batch.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool over `db_path` with WAL journaling, foreign keys and the
/// configured busy timeout applied to every connection.
///
/// `:memory:` yields a fresh shared-cache database that all connections in
/// the returned pool share; two pools never see each other's data.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let (target, flags) = open_target(db_path);
    let manager = SqliteConnectionManager::file(target)
        .with_flags(flags)
        .with_init(move |conn| configure_connection(conn, settings.busy_timeout_ms));

    Ok(Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?)
}

fn open_target(db_path: &str) -> (String, OpenFlags) {
    let base = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    if db_path != ":memory:" {
        return (db_path.to_string(), base);
    }

    static NEXT_MEMORY_DB: AtomicU64 = AtomicU64::new(0);
    let name = format!(
        "file:ringline-mem-{}-{}?mode=memory&cache=shared",
        std::process::id(),
        NEXT_MEMORY_DB.fetch_add(1, Ordering::Relaxed)
    );
    (
        name,
        base | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_SHARED_CACHE,
    )
}

fn configure_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    // Memory databases cannot use WAL and keep reporting "memory".
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if !matches!(mode.as_str(), "wal" | "memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal mode stayed {} after requesting WAL", mode)),
        ));
    }
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
        busy_timeout_ms
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn connections_carry_configured_pragmas() {
        let pool = create_pool(
            ":memory:",
            DbRuntimeSettings {
                busy_timeout_ms: 1_200,
                pool_max_size: 2,
            },
        )
        .unwrap();
        let conn = pool.get().unwrap();

        let fk: i32 = conn.query_row("PRAGMA foreign_keys;", [], |r| r.get(0)).unwrap();
        let busy: i32 = conn.query_row("PRAGMA busy_timeout;", [], |r| r.get(0)).unwrap();
        assert_eq!((fk, busy), (1, 1_200));
        assert_eq!(pool.max_size(), 2);
    }

    #[test]
    fn memory_pool_is_shared_within_and_isolated_across_pools() {
        let calls = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
        let other = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();

        calls
            .get()
            .unwrap()
            .execute_batch("CREATE TABLE scratch (id INTEGER PRIMARY KEY);")
            .unwrap();

        assert!(table_exists(&calls.get().unwrap(), "scratch"));
        assert!(!table_exists(&other.get().unwrap(), "scratch"));
    }
}
