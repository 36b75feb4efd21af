//! Caller history snapshot assembled at session start.

use serde::{Deserialize, Serialize};

/// What the store knows about the caller's contact record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    /// UTC RFC 3339 timestamp.
    pub scheduled_at: String,
    pub service_type: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub timestamp: String,
    pub last_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    pub timestamp: String,
    pub answered: bool,
    pub duration_seconds: Option<i64>,
}

/// Immutable snapshot of the caller's history.
///
/// Built once by the context loader and only read afterwards. Corrections
/// made during the call go to the store, never into this value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallerContext {
    pub contact: Option<ContactSnapshot>,
    pub recent_appointments: Vec<AppointmentSummary>,
    pub recent_conversations: Vec<ConversationSummary>,
    pub recent_calls: Vec<CallSummary>,
}

impl CallerContext {
    /// True when the caller has no contact record and no history at all.
    pub fn is_first_time_caller(&self) -> bool {
        self.contact.is_none()
            && self.recent_appointments.is_empty()
            && self.recent_conversations.is_empty()
            && self.recent_calls.is_empty()
    }

    pub fn caller_name(&self) -> Option<&str> {
        self.contact.as_ref().and_then(|c| c.name.as_deref())
    }
}
