//! Tool Call Dispatcher.
//!
//! The model invokes tools by name with a JSON argument string. Each tool is
//! a [`Tool`] registered in a [`ToolRegistry`]; dispatch looks the name up,
//! decodes the arguments, and runs the handler against a [`ToolContext`]
//! built from the session. Every failure is folded into a
//! `{"success": false, "error": ...}` result so a bad call never reaches
//! the session loop.

mod appointments;
mod contacts;
mod hours;
mod messages;
mod services;

pub use appointments::{
    confirmation_code, CancelAppointment, CreateAppointment, RescheduleAppointment,
};
pub use contacts::UpdateContactInfo;
pub use hours::{check_hours, CheckBusinessHours};
pub use messages::{SendConfirmationSms, TakeMessage};
pub use services::{services_info, GetServicesInfo};

use crate::messaging::{MessageSender, MessagingError};
use async_trait::async_trait;
use ringline_db::DbPool;
use ringline_store::StoreError;
use ringline_types::{BusinessConfig, ToolCallRequest, ToolCallResult};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Session lacks something the tool needs, e.g. the business.
    #[error("{0}")]
    MissingContext(&'static str),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("message not sent: {0}")]
    Messaging(#[from] MessagingError),
    #[error("data store unavailable: {0}")]
    Unavailable(String),
}

/// Everything a tool may touch. Built once per session.
pub struct ToolContext {
    pub session_id: String,
    pub business: Option<Arc<BusinessConfig>>,
    pub contact_id: Option<String>,
    pub caller_phone: Option<String>,
    pub pool: DbPool,
    pub messenger: Arc<dyn MessageSender>,
}

impl ToolContext {
    pub fn business(&self) -> Result<&BusinessConfig, ToolError> {
        self.business
            .as_deref()
            .ok_or(ToolError::MissingContext("business context unavailable"))
    }

    /// Runs store work on a blocking thread with a pooled connection.
    pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T, ToolError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ToolError::Unavailable(e.to_string()))?;
            f(&conn).map_err(ToolError::from)
        })
        .await
        .map_err(|e| ToolError::Unavailable(e.to_string()))?
    }

    /// Texts the caller from the business number if both are known.
    ///
    /// Failures are logged and reported as `false`; callers treat the
    /// message as optional.
    pub(crate) async fn notify_caller(&self, business: &BusinessConfig, body: &str) -> bool {
        let (Some(from), Some(to)) = (business.phone_number.as_deref(), self.caller_phone.as_deref())
        else {
            tracing::debug!(session_id = %self.session_id, "skipping confirmation text, phone number unknown");
            return false;
        };
        match self.messenger.send(from, to, body).await {
            Ok(sid) => {
                tracing::info!(session_id = %self.session_id, message_sid = %sid, "confirmation text sent");
                true
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "confirmation text failed");
                false
            }
        }
    }
}

/// A named operation the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Function definition advertised in `session.update`.
    fn schema(&self) -> Value;

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError>;
}

/// Lookup table from tool name to handler.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every tool the receptionist offers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CreateAppointment));
        registry.register(Arc::new(RescheduleAppointment));
        registry.register(Arc::new(CancelAppointment));
        registry.register(Arc::new(SendConfirmationSms));
        registry.register(Arc::new(TakeMessage));
        registry.register(Arc::new(UpdateContactInfo));
        registry.register(Arc::new(CheckBusinessHours));
        registry.register(Arc::new(GetServicesInfo));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Function definitions sorted by name.
    pub fn schemas(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.schema())
            .collect()
    }

    /// Runs one tool call. Never fails; errors become the result payload.
    pub async fn dispatch(&self, ctx: &ToolContext, request: &ToolCallRequest) -> ToolCallResult {
        let outcome = match self.tools.get(request.name.as_str()) {
            None => Err(ToolError::UnknownTool(request.name.clone())),
            Some(tool) => match parse_arguments(&request.arguments) {
                Ok(args) => tool.call(ctx, args).await,
                Err(e) => Err(e),
            },
        };

        let output = match outcome {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    session_id = %ctx.session_id,
                    tool = %request.name,
                    call_id = %request.call_id,
                    error = %e,
                    "tool call failed"
                );
                json!({ "success": false, "error": e.to_string() })
            }
        };

        ToolCallResult {
            call_id: request.call_id.clone(),
            name: request.name.clone(),
            output,
        }
    }
}

fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Decodes a tool's typed argument struct.
pub(crate) fn decode_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Builds a function definition in the shape the model expects.
pub(crate) fn function_schema(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "name": name,
        "description": description,
        "parameters": parameters,
    })
}
