//! Appointment records.

use crate::{format_timestamp, new_id, StoreError};
use chrono::{DateTime, Utc};
use ringline_types::{AppointmentStatus, AppointmentSummary};
use rusqlite::{params, Connection, OptionalExtension, Row};

const APPOINTMENT_COLUMNS: &str = "id, business_id, contact_id, scheduled_at, service_type, \
     caller_name, notes, status, confirmation_code, status_reason";

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub business_id: String,
    pub contact_id: Option<String>,
    /// UTC RFC 3339.
    pub scheduled_at: String,
    pub service_type: Option<String>,
    pub caller_name: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub confirmation_code: String,
    pub status_reason: Option<String>,
}

impl Appointment {
    pub fn scheduled_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.scheduled_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Parameters for creating a new appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment<'a> {
    pub business_id: &'a str,
    pub contact_id: Option<&'a str>,
    pub scheduled_at: DateTime<Utc>,
    pub service_type: Option<&'a str>,
    pub caller_name: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub confirmation_code: &'a str,
}

pub fn create_appointment(
    conn: &Connection,
    new: &NewAppointment<'_>,
) -> Result<Appointment, StoreError> {
    let id = new_id();
    conn.execute(
        "INSERT INTO appointments (
            id, business_id, contact_id, scheduled_at, service_type,
            caller_name, notes, status, confirmation_code
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            new.business_id,
            new.contact_id,
            format_timestamp(new.scheduled_at),
            new.service_type,
            new.caller_name,
            new.notes,
            AppointmentStatus::Scheduled.as_str(),
            new.confirmation_code,
        ],
    )?;
    tracing::debug!(business_id = new.business_id, appointment_id = %id, "appointment created");
    get_appointment(conn, new.business_id, &id)
}

pub fn get_appointment(
    conn: &Connection,
    business_id: &str,
    appointment_id: &str,
) -> Result<Appointment, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE business_id = ?1 AND id = ?2"
        ),
        params![business_id, appointment_id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound {
        entity: "appointment",
        id: appointment_id.to_string(),
    })
}

/// The contact's single nearest appointment at or after `now` that is not
/// cancelled or completed.
pub fn next_upcoming(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<Appointment>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE business_id = ?1 AND contact_id = ?2 AND scheduled_at >= ?3
                   AND status NOT IN ('cancelled', 'completed')
                 ORDER BY scheduled_at ASC LIMIT 1"
            ),
            params![business_id, contact_id, format_timestamp(now)],
            map_row,
        )
        .optional()?)
}

/// Moves an appointment to a new time and marks it rescheduled.
pub fn reschedule(
    conn: &Connection,
    business_id: &str,
    appointment_id: &str,
    new_time: DateTime<Utc>,
    reason: Option<&str>,
) -> Result<Appointment, StoreError> {
    let changed = conn.execute(
        "UPDATE appointments
         SET scheduled_at = ?1, status = ?2, status_reason = ?3,
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
         WHERE business_id = ?4 AND id = ?5",
        params![
            format_timestamp(new_time),
            AppointmentStatus::Rescheduled.as_str(),
            reason,
            business_id,
            appointment_id,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity: "appointment",
            id: appointment_id.to_string(),
        });
    }
    tracing::debug!(business_id, appointment_id, "appointment rescheduled");
    get_appointment(conn, business_id, appointment_id)
}

pub fn cancel(
    conn: &Connection,
    business_id: &str,
    appointment_id: &str,
    reason: Option<&str>,
) -> Result<Appointment, StoreError> {
    let changed = conn.execute(
        "UPDATE appointments
         SET status = ?1, status_reason = ?2,
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
         WHERE business_id = ?3 AND id = ?4",
        params![
            AppointmentStatus::Cancelled.as_str(),
            reason,
            business_id,
            appointment_id,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity: "appointment",
            id: appointment_id.to_string(),
        });
    }
    tracing::debug!(business_id, appointment_id, "appointment cancelled");
    get_appointment(conn, business_id, appointment_id)
}

/// Most recent appointments for a contact, newest first.
pub fn recent_for_contact(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
    limit: usize,
) -> Result<Vec<AppointmentSummary>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT scheduled_at, service_type, status FROM appointments
         WHERE business_id = ?1 AND contact_id = ?2
         ORDER BY scheduled_at DESC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![business_id, contact_id, limit as i64], |row| {
        Ok(AppointmentSummary {
            scheduled_at: row.get(0)?,
            service_type: row.get(1)?,
            status: row.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn map_row(row: &Row) -> rusqlite::Result<Appointment> {
    let status: String = row.get(7)?;
    let status = status.parse::<AppointmentStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Appointment {
        id: row.get(0)?,
        business_id: row.get(1)?,
        contact_id: row.get(2)?,
        scheduled_at: row.get(3)?,
        service_type: row.get(4)?,
        caller_name: row.get(5)?,
        notes: row.get(6)?,
        status,
        confirmation_code: row.get(8)?,
        status_reason: row.get(9)?,
    })
}
