//! Call records.

use crate::{format_timestamp, new_id, StoreError};
use chrono::{DateTime, Utc};
use ringline_types::CallSummary;
use rusqlite::{params, Connection, OptionalExtension, Row};

#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub id: String,
    pub call_sid: Option<String>,
    pub business_id: String,
    pub contact_id: Option<String>,
    pub caller_phone: Option<String>,
    pub answered: bool,
    pub duration_seconds: Option<i64>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

pub fn find_by_sid(conn: &Connection, call_sid: &str) -> Result<Option<CallRecord>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, call_sid, business_id, contact_id, caller_phone, answered,
                    duration_seconds, started_at, ended_at
             FROM calls WHERE call_sid = ?1",
            [call_sid],
            map_row,
        )
        .optional()?)
}

pub fn create_call(
    conn: &Connection,
    call_sid: Option<&str>,
    business_id: &str,
    contact_id: Option<&str>,
    caller_phone: Option<&str>,
    started_at: DateTime<Utc>,
) -> Result<CallRecord, StoreError> {
    let id = new_id();
    conn.execute(
        "INSERT INTO calls (id, call_sid, business_id, contact_id, caller_phone, started_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            call_sid,
            business_id,
            contact_id,
            caller_phone,
            format_timestamp(started_at),
        ],
    )?;
    get_call(conn, &id)
}

pub fn get_call(conn: &Connection, call_id: &str) -> Result<CallRecord, StoreError> {
    conn.query_row(
        "SELECT id, call_sid, business_id, contact_id, caller_phone, answered,
                duration_seconds, started_at, ended_at
         FROM calls WHERE id = ?1",
        [call_id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound {
        entity: "call",
        id: call_id.to_string(),
    })
}

/// Attaches a resolved contact to a call that has none yet.
pub fn attach_contact(conn: &Connection, call_id: &str, contact_id: &str) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE calls SET contact_id = ?1 WHERE id = ?2 AND contact_id IS NULL",
        params![contact_id, call_id],
    )?;
    Ok(())
}

/// Marks a call finished.
pub fn finish_call(
    conn: &Connection,
    call_id: &str,
    answered: bool,
    duration_seconds: i64,
    ended_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE calls SET answered = ?1, duration_seconds = ?2, ended_at = ?3 WHERE id = ?4",
        params![answered, duration_seconds, format_timestamp(ended_at), call_id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity: "call",
            id: call_id.to_string(),
        });
    }
    tracing::debug!(call_id, answered, duration_seconds, "call record finished");
    Ok(())
}

/// Previous calls from the same number, newest first, excluding `exclude_id`.
pub fn recent_for_caller(
    conn: &Connection,
    business_id: &str,
    caller_phone: &str,
    exclude_id: Option<&str>,
    limit: usize,
) -> Result<Vec<CallSummary>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT started_at, answered, duration_seconds FROM calls
         WHERE business_id = ?1 AND caller_phone = ?2 AND id != COALESCE(?3, '')
         ORDER BY started_at DESC LIMIT ?4",
    )?;
    let rows = stmt.query_map(
        params![business_id, caller_phone, exclude_id, limit as i64],
        |row| {
            Ok(CallSummary {
                timestamp: row.get(0)?,
                answered: row.get(1)?,
                duration_seconds: row.get(2)?,
            })
        },
    )?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn map_row(row: &Row) -> rusqlite::Result<CallRecord> {
    Ok(CallRecord {
        id: row.get(0)?,
        call_sid: row.get(1)?,
        business_id: row.get(2)?,
        contact_id: row.get(3)?,
        caller_phone: row.get(4)?,
        answered: row.get(5)?,
        duration_seconds: row.get(6)?,
        started_at: row.get(7)?,
        ended_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_conn;
    use chrono::{Duration, TimeZone};

    #[test]
    fn finish_call_records_duration() {
        let conn = migrated_conn();
        let start = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();
        let call = create_call(&conn, Some("CA123"), "biz-1", None, Some("+1555"), start).unwrap();
        finish_call(&conn, &call.id, true, 95, start + Duration::seconds(95)).unwrap();

        let stored = find_by_sid(&conn, "CA123").unwrap().unwrap();
        assert!(stored.answered);
        assert_eq!(stored.duration_seconds, Some(95));
        assert_eq!(stored.ended_at.as_deref(), Some("2026-10-17T09:01:35Z"));
    }

    #[test]
    fn recent_for_caller_excludes_current_call() {
        let conn = migrated_conn();
        let start = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        let old = create_call(&conn, Some("CA1"), "biz-1", None, Some("+1555"), start).unwrap();
        finish_call(&conn, &old.id, true, 30, start + Duration::seconds(30)).unwrap();
        let current = create_call(
            &conn,
            Some("CA2"),
            "biz-1",
            None,
            Some("+1555"),
            start + Duration::days(3),
        )
        .unwrap();

        let recent = recent_for_caller(&conn, "biz-1", "+1555", Some(&current.id), 5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].timestamp, "2026-10-01T09:00:00Z");
        assert_eq!(recent[0].duration_seconds, Some(30));
    }
}
