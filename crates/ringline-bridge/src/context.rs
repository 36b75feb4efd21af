//! Caller Context Loader.
//!
//! Runs once per session, before the model channel is opened. Everything it
//! returns is a snapshot: later corrections go through the tools to the
//! store and never back into the `CallerContext`.

use crate::error::BridgeError;
use crate::protocol::StartMetadata;
use chrono::{DateTime, Utc};
use ringline_db::DbPool;
use ringline_store::{appointments, businesses, calls, contacts, conversations};
use ringline_types::{BusinessConfig, CallerContext};
use rusqlite::Connection;

/// What the telephony side told us about the call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallIdentity {
    pub call_sid: Option<String>,
    pub business_id: Option<String>,
    pub caller_phone: Option<String>,
}

impl CallIdentity {
    pub fn from_start(start: &StartMetadata) -> Self {
        Self {
            call_sid: start.call_sid.clone().filter(|s| !s.is_empty()),
            business_id: start.parameter("businessId").map(str::to_string),
            caller_phone: start.parameter("callerPhone").map(str::to_string),
        }
    }
}

/// Result of loading: the business, who is calling, and their history.
#[derive(Debug, Clone)]
pub struct LoadedCall {
    pub business: BusinessConfig,
    pub contact_id: Option<String>,
    pub caller_phone: Option<String>,
    /// Row in `calls` that is finalised when the session closes.
    pub call_record_id: String,
    pub context: CallerContext,
}

/// Loads the call on a blocking thread with a pooled connection.
pub async fn load_caller_context(
    pool: &DbPool,
    identity: CallIdentity,
    history_limit: usize,
) -> Result<LoadedCall, BridgeError> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        load_call(&conn, &identity, history_limit, Utc::now())
    })
    .await?
}

pub fn load_call(
    conn: &Connection,
    identity: &CallIdentity,
    history_limit: usize,
    now: DateTime<Utc>,
) -> Result<LoadedCall, BridgeError> {
    let existing = match identity.call_sid.as_deref() {
        Some(sid) => calls::find_by_sid(conn, sid)?,
        None => None,
    };

    let business_id = existing
        .as_ref()
        .map(|c| c.business_id.clone())
        .or_else(|| identity.business_id.clone())
        .ok_or_else(|| BridgeError::Context("call carries no business id".to_string()))?;
    let business = businesses::get_business(conn, &business_id)?;

    let caller_phone = existing
        .as_ref()
        .and_then(|c| c.caller_phone.clone())
        .or_else(|| identity.caller_phone.clone());

    let mut contact_id = existing.as_ref().and_then(|c| c.contact_id.clone());
    if contact_id.is_none() {
        if let Some(phone) = caller_phone.as_deref() {
            contact_id = contacts::find_by_phone(conn, &business_id, phone)?.map(|c| c.id);
        }
    }

    let record = match existing {
        Some(record) => {
            if let (None, Some(cid)) = (&record.contact_id, &contact_id) {
                calls::attach_contact(conn, &record.id, cid)?;
            }
            record
        }
        None => calls::create_call(
            conn,
            identity.call_sid.as_deref(),
            &business_id,
            contact_id.as_deref(),
            caller_phone.as_deref(),
            now,
        )?,
    };

    let mut context = CallerContext::default();
    if let Some(cid) = contact_id.as_deref() {
        context.contact = Some(contacts::get_contact(conn, &business_id, cid)?.into());
        context.recent_appointments =
            appointments::recent_for_contact(conn, &business_id, cid, history_limit)?;
        context.recent_conversations =
            conversations::recent_for_contact(conn, &business_id, cid, history_limit)?;
    }
    if let Some(phone) = caller_phone.as_deref() {
        context.recent_calls =
            calls::recent_for_caller(conn, &business_id, phone, Some(&record.id), history_limit)?;
    }

    tracing::debug!(
        business_id = %business_id,
        call_sid = ?identity.call_sid,
        contact_id = ?contact_id,
        first_time = context.is_first_time_caller(),
        "caller context loaded"
    );

    Ok(LoadedCall {
        business,
        contact_id,
        caller_phone,
        call_record_id: record.id,
        context,
    })
}
