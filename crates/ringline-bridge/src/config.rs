//! Runtime settings for bridging sessions.

use std::fmt;
use std::time::Duration;

pub const DEFAULT_MODEL_URL: &str =
    "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-10-01";

/// Settings shared by every session the process bridges.
#[derive(Clone)]
pub struct BridgeConfig {
    /// WebSocket URL of the speech model.
    pub model_url: String,
    /// Bearer token for the model endpoint.
    pub api_key: String,
    /// Voice used when the business has none configured.
    pub default_voice: String,
    pub temperature: f32,
    /// How long to wait for `session.created` before failing the session.
    pub session_timeout: Duration,
    /// Rows of each history kind loaded into the caller context.
    pub history_limit: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            model_url: DEFAULT_MODEL_URL.to_string(),
            api_key: String::new(),
            default_voice: "alloy".to_string(),
            temperature: 0.8,
            session_timeout: Duration::from_secs(10),
            history_limit: 5,
        }
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("model_url", &self.model_url)
            .field("api_key", &"[REDACTED]")
            .field("default_voice", &self.default_voice)
            .field("temperature", &self.temperature)
            .field("session_timeout", &self.session_timeout)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}
