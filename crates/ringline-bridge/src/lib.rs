//! Real-time voice bridge between a telephony media stream and a
//! speech-to-speech model.
//!
//! A server hands each accepted media-stream connection to [`run_session`]
//! as a [`TelephonyLink`]. The session loads the caller's context, opens the
//! model channel through a [`ModelConnector`], relays audio both ways via the
//! [`AudioPump`], cuts the assistant off when the caller barges in, and runs
//! tool calls through the [`ToolRegistry`] without stalling audio.

pub mod config;
pub mod context;
pub mod error;
pub mod instructions;
pub mod interrupt;
pub mod lifecycle;
pub mod local_time;
pub mod messaging;
pub mod model_client;
pub mod playback;
pub mod protocol;
pub mod pump;
pub mod session;
pub mod tools;

pub use config::BridgeConfig;
pub use context::{load_caller_context, CallIdentity, LoadedCall};
pub use error::BridgeError;
pub use interrupt::Interruption;
pub use messaging::{DisabledSender, MessageSender, MessagingError, TwilioSender};
pub use model_client::{ModelConnector, ModelLink, RealtimeConnector};
pub use pump::AudioPump;
pub use session::{run_session, BridgeDeps, CallSession, SessionOutcome, TelephonyLink};
pub use tools::{Tool, ToolContext, ToolError, ToolRegistry};
