//! Wire formats for the two channels a session bridges.
//!
//! Both channels exchange JSON text frames. Inbound frames are decoded into
//! `TelephonyEvent` / `ModelEvent`; outbound frames are encoded from
//! `TelephonyCommand` / `ModelCommand`. Unknown event types decode to an
//! `Other` variant so new upstream events never break a live call.

pub mod model;
pub mod telephony;

pub use model::{
    ContentPart, ConversationItem, ModelCommand, ModelErrorDetail, ModelEvent, SessionSettings,
    TranscriptionSettings, TurnDetection,
};
pub use telephony::{MarkPayload, MediaPayload, OutboundMedia, StartMetadata, TelephonyCommand, TelephonyEvent};
