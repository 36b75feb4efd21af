//! Business configuration snapshot.
//!
//! A `BusinessConfig` is read once when a call starts and handed to every
//! component that needs it. Hours and services live here as explicit fields
//! so that tool handlers never consult process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opening hours for one weekday. Times are `HH:MM` in the business timezone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(default)]
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl DayHours {
    pub fn open(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            open: true,
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    pub fn closed() -> Self {
        Self::default()
    }
}

/// Weekly schedule keyed by lowercase English day name (`"monday"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyHours(pub BTreeMap<String, DayHours>);

impl WeeklyHours {
    /// Looks up a day by name, case-insensitively.
    pub fn day(&self, name: &str) -> Option<&DayHours> {
        self.0.get(&name.to_ascii_lowercase())
    }

    pub fn set(&mut self, name: &str, hours: DayHours) {
        self.0.insert(name.to_ascii_lowercase(), hours);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A service the business offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl ServiceInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            price: None,
            duration_minutes: None,
        }
    }
}

/// Everything the bridge needs to know about the business taking the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessConfig {
    pub id: String,
    pub name: String,
    /// Business-owned number used as the sender for outbound messages.
    pub phone_number: Option<String>,
    /// Free-form owner instructions for the assistant.
    pub instructions: Option<String>,
    /// Model voice name.
    pub voice: String,
    /// BCP-47 language tag the assistant should speak.
    pub language: String,
    /// IANA timezone name, e.g. `America/New_York`.
    pub timezone: String,
    pub hours: WeeklyHours,
    pub services: Vec<ServiceInfo>,
    pub knowledge_base: Option<String>,
}

impl BusinessConfig {
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }
}
