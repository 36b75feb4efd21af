//! Shared types for the Ringline voice bridge.
//!
//! This crate holds the vocabulary every other Ringline crate speaks:
//! session lifecycle states, business configuration snapshots, caller
//! history rows, and the request/result pair exchanged with the speech
//! model when it invokes a tool.
//!
//! Nothing here performs I/O. The store crate persists these shapes and the
//! bridge crate moves them between the telephony and model channels.

pub mod business;
pub mod context;

pub use business::{BusinessConfig, DayHours, ServiceInfo, WeeklyHours};
pub use context::{AppointmentSummary, CallSummary, CallerContext, ContactSnapshot, ConversationSummary};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a stored string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind}: {value}")]
pub struct ParseVariantError {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle state of a single bridged call.
///
/// `Connecting -> Active -> Closing -> Closed`, with `Failed` reachable from
/// every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Telephony accepted; context loading and model handshake in progress.
    Connecting,
    /// Both channels open and audio flowing.
    Active,
    /// One side signalled stop; the other is being shut down.
    Closing,
    /// Both channels closed normally.
    Closed,
    /// Unrecoverable error. No further I/O.
    Failed,
}

impl SessionState {
    /// Returns `true` for states that admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Returns `true` when moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Connecting, Active) | (Connecting, Closing) => true,
            (Active, Closing) => true,
            (Closing, Closed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a stored appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Rescheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "rescheduled" => Ok(Self::Rescheduled),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(ParseVariantError {
                kind: "appointment status",
                value: other.to_string(),
            }),
        }
    }
}

/// Priority attached to a message taken on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl InquiryPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for InquiryPriority {
    type Err = ParseVariantError;

    /// Accepts the canonical names plus "urgent", which maps to `High`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "normal" => Ok(Self::Medium),
            "high" | "urgent" => Ok(Self::High),
            other => Err(ParseVariantError {
                kind: "inquiry priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A function call issued by the speech model mid-conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Model-assigned correlation id. Unique per logical call.
    pub call_id: String,
    /// Registered tool name.
    pub name: String,
    /// Raw JSON argument string as emitted by the model.
    pub arguments: String,
}

/// The JSON value returned to the model for a [`ToolCallRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub name: String,
    pub output: serde_json::Value,
}

impl ToolCallResult {
    /// Whether the handler reported success (`output.success == true`).
    pub fn is_success(&self) -> bool {
        self.output
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}
