use ringline_store::StoreError;
use thiserror::Error;

/// Errors that end or prevent a bridging session.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A channel failed to open or dropped unexpectedly.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The caller context could not be assembled.
    #[error("context unavailable: {0}")]
    Context(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl From<r2d2::Error> for BridgeError {
    fn from(e: r2d2::Error) -> Self {
        BridgeError::Context(format!("database pool: {}", e))
    }
}

impl From<tokio::task::JoinError> for BridgeError {
    fn from(e: tokio::task::JoinError) -> Self {
        BridgeError::Context(format!("blocking task failed: {}", e))
    }
}
