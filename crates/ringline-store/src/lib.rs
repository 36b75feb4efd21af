//! Data-store operations for Ringline.
//!
//! Every function takes a borrowed `rusqlite::Connection` and is scoped by
//! business id (and contact id where relevant). Callers in async code run
//! these inside `tokio::task::spawn_blocking` with a pooled connection.
//!
//! Timestamps are stored as UTC RFC 3339 strings with second precision
//! (`2026-10-17T14:00:00Z`), which keeps lexical and chronological order
//! identical so range queries can compare text directly.

pub mod appointments;
pub mod businesses;
pub mod calls;
pub mod contacts;
pub mod conversations;
pub mod inquiries;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Formats a UTC instant the way every timestamp column stores it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Generates a fresh record id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;

    /// Opens an in-memory database with the full schema and one business.
    pub fn migrated_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        ringline_db::run_migrations(&conn).expect("migrations should succeed");
        conn.execute(
            "INSERT INTO businesses (id, name, phone_number) VALUES ('biz-1', 'Shear Delight', '+15550000000')",
            [],
        )
        .expect("should seed business");
        conn
    }
}
