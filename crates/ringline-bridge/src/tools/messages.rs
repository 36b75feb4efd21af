use super::{decode_args, function_schema, Tool, ToolContext, ToolError};
use async_trait::async_trait;
use ringline_store::{contacts, inquiries};
use ringline_types::InquiryPriority;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct SmsArgs {
    message: String,
}

/// Texts the caller verbatim. Unlike booking confirmations, a failed send
/// fails the call.
pub struct SendConfirmationSms;

#[async_trait]
impl Tool for SendConfirmationSms {
    fn name(&self) -> &'static str {
        "send_confirmation_sms"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Send a text message to the caller's phone.",
            json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string", "description": "Exact text to send"}
                },
                "required": ["message"]
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: SmsArgs = decode_args(args)?;
        let from = business
            .phone_number
            .as_deref()
            .ok_or(ToolError::MissingContext("business phone number unknown"))?;
        let to = ctx
            .caller_phone
            .as_deref()
            .ok_or(ToolError::MissingContext("caller phone number unknown"))?;

        let sid = ctx.messenger.send(from, to, &args.message).await?;
        tracing::info!(session_id = %ctx.session_id, message_sid = %sid, "text message sent");
        Ok(json!({ "success": true, "message_sid": sid }))
    }
}

#[derive(Deserialize)]
struct MessageArgs {
    #[serde(default)]
    caller_name: Option<String>,
    message: String,
    #[serde(default)]
    callback_requested: Option<bool>,
    #[serde(default)]
    urgency: Option<String>,
}

/// Records an inquiry for the business to follow up on.
pub struct TakeMessage;

#[async_trait]
impl Tool for TakeMessage {
    fn name(&self) -> &'static str {
        "take_message"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Take a message for the business owner.",
            json!({
                "type": "object",
                "properties": {
                    "caller_name": {"type": "string"},
                    "message": {"type": "string"},
                    "callback_requested": {"type": "boolean"},
                    "urgency": {"type": "string", "enum": ["low", "medium", "high"]}
                },
                "required": ["message"]
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: MessageArgs = decode_args(args)?;
        let priority = args
            .urgency
            .as_deref()
            .and_then(|u| u.parse::<InquiryPriority>().ok())
            .unwrap_or_default();
        let callback_requested = args.callback_requested.unwrap_or(false);

        let business_id = business.id.clone();
        let contact_id = ctx.contact_id.clone();
        let caller_phone = ctx.caller_phone.clone();
        let (inquiry_id, name_saved) = ctx
            .with_conn(move |conn| {
                let id = inquiries::create_inquiry(
                    conn,
                    &inquiries::NewInquiry {
                        business_id: &business_id,
                        contact_id: contact_id.as_deref(),
                        caller_name: args.caller_name.as_deref(),
                        caller_phone: caller_phone.as_deref(),
                        message: &args.message,
                        callback_requested,
                        priority,
                    },
                )?;
                let name_saved = match (contact_id.as_deref(), args.caller_name.as_deref()) {
                    (Some(cid), Some(name)) if !name.trim().is_empty() => {
                        contacts::set_name_if_missing(conn, &business_id, cid, name.trim())?
                    }
                    _ => false,
                };
                Ok((id, name_saved))
            })
            .await?;

        tracing::info!(
            session_id = %ctx.session_id,
            inquiry_id = %inquiry_id,
            priority = priority.as_str(),
            name_saved,
            "message taken"
        );

        Ok(json!({
            "success": true,
            "inquiry_id": inquiry_id,
            "priority": priority.as_str(),
            "callback_requested": callback_requested,
        }))
    }
}
