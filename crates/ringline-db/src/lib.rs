//! Database layer for Ringline.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization
//! and embedded SQL migrations. Every table the bridge reads or writes is
//! created through a versioned migration managed here; the query helpers
//! live in `ringline-store`.
//!
//! - **SQLite with WAL mode**: calls read business config concurrently while
//!   tool handlers write single rows, which is the reader-heavy pattern WAL
//!   serves well.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` and applied in order on startup.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
