//! Messages taken on a caller's behalf.

use crate::{new_id, StoreError};
use ringline_types::InquiryPriority;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone)]
pub struct NewInquiry<'a> {
    pub business_id: &'a str,
    pub contact_id: Option<&'a str>,
    pub caller_name: Option<&'a str>,
    pub caller_phone: Option<&'a str>,
    pub message: &'a str,
    pub callback_requested: bool,
    pub priority: InquiryPriority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inquiry {
    pub id: String,
    pub business_id: String,
    pub contact_id: Option<String>,
    pub caller_name: Option<String>,
    pub caller_phone: Option<String>,
    pub message: String,
    pub callback_requested: bool,
    pub priority: String,
    pub status: String,
}

/// Inserts an inquiry and returns its id.
pub fn create_inquiry(conn: &Connection, new: &NewInquiry<'_>) -> Result<String, StoreError> {
    let id = new_id();
    conn.execute(
        "INSERT INTO inquiries (
            id, business_id, contact_id, caller_name, caller_phone,
            message, callback_requested, priority
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            new.business_id,
            new.contact_id,
            new.caller_name,
            new.caller_phone,
            new.message,
            new.callback_requested,
            new.priority.as_str(),
        ],
    )?;
    tracing::debug!(business_id = new.business_id, inquiry_id = %id, priority = new.priority.as_str(), "inquiry recorded");
    Ok(id)
}

pub fn get_inquiry(
    conn: &Connection,
    business_id: &str,
    inquiry_id: &str,
) -> Result<Inquiry, StoreError> {
    conn.query_row(
        "SELECT id, business_id, contact_id, caller_name, caller_phone, message,
                callback_requested, priority, status
         FROM inquiries WHERE business_id = ?1 AND id = ?2",
        params![business_id, inquiry_id],
        |row| {
            Ok(Inquiry {
                id: row.get(0)?,
                business_id: row.get(1)?,
                contact_id: row.get(2)?,
                caller_name: row.get(3)?,
                caller_phone: row.get(4)?,
                message: row.get(5)?,
                callback_requested: row.get(6)?,
                priority: row.get(7)?,
                status: row.get(8)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound {
        entity: "inquiry",
        id: inquiry_id.to_string(),
    })
}
