//! Server configuration loading from file and environment variables.

use ringline_bridge::config::DEFAULT_MODEL_URL;
use ringline_bridge::BridgeConfig;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Speech model connection.
    #[serde(default)]
    pub model: ModelConfig,

    /// Outbound SMS provider. Sending is disabled without credentials.
    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub context: ContextConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "ringline_bridge=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

#[derive(Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    /// Voice used when a business has none configured.
    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Time allowed for the model to acknowledge a new session.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

#[derive(Clone, Default, Deserialize)]
pub struct MessagingConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Overrides the provider API base URL.
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Rows of each history kind shown to the model per call.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5050
}

fn default_db_path() -> String {
    "ringline.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_url() -> String {
    DEFAULT_MODEL_URL.to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_session_timeout_ms() -> u64 {
    10_000
}

fn default_history_limit() -> usize {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: default_model_url(),
            api_key: String::new(),
            voice: default_voice(),
            temperature: default_temperature(),
            session_timeout_ms: default_session_timeout_ms(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("voice", &self.voice)
            .field("temperature", &self.temperature)
            .field("session_timeout_ms", &self.session_timeout_ms)
            .finish()
    }
}

impl fmt::Debug for MessagingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl MessagingConfig {
    /// Account sid and token, when both are set and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let sid = self.account_sid.as_deref().filter(|s| !s.trim().is_empty())?;
        let token = self.auth_token.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((sid, token))
    }
}

impl Config {
    /// Per-session bridge settings derived from `[model]` and `[context]`.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            model_url: self.model.url.clone(),
            api_key: self.model.api_key.clone(),
            default_voice: self.model.voice.clone(),
            temperature: self.model.temperature,
            session_timeout: Duration::from_millis(self.model.session_timeout_ms),
            history_limit: self.context.history_limit,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `RINGLINE_HOST` overrides `server.host`
/// - `RINGLINE_PORT` overrides `server.port`
/// - `RINGLINE_DB_PATH` overrides `database.path`
/// - `RINGLINE_LOG_LEVEL` overrides `logging.level`
/// - `RINGLINE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `OPENAI_API_KEY` overrides `model.api_key`
/// - `RINGLINE_MODEL_URL` overrides `model.url`
/// - `TWILIO_ACCOUNT_SID` / `TWILIO_AUTH_TOKEN` override the messaging credentials
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("RINGLINE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("RINGLINE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = lookup("RINGLINE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("RINGLINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("RINGLINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(key) = lookup("OPENAI_API_KEY") {
        config.model.api_key = key;
    }
    if let Some(url) = lookup("RINGLINE_MODEL_URL") {
        config.model.url = url;
    }
    if let Some(sid) = lookup("TWILIO_ACCOUNT_SID") {
        config.messaging.account_sid = Some(sid);
    }
    if let Some(token) = lookup("TWILIO_AUTH_TOKEN") {
        config.messaging.auth_token = Some(token);
    }
}
