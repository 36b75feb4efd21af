use super::{decode_args, function_schema, Tool, ToolContext, ToolError};
use crate::local_time::{business_tz, describe_local, parse_local_datetime};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ringline_store::appointments::{self, NewAppointment};
use serde::Deserialize;
use serde_json::{json, Value};

/// `APT-` followed by the epoch milliseconds in upper-case base 36.
pub fn confirmation_code(now: DateTime<Utc>) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut n = now.timestamp_millis().max(0) as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.reverse();
    format!("APT-{}", String::from_utf8_lossy(&digits))
}

fn nothing_found(action: &str) -> Value {
    json!({
        "success": false,
        "found": false,
        "message": format!("The caller has no upcoming appointment to {}.", action),
    })
}

#[derive(Deserialize)]
struct CreateArgs {
    scheduled_date: String,
    #[serde(default)]
    service_type: Option<String>,
    #[serde(default)]
    caller_name: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

pub struct CreateAppointment;

#[async_trait]
impl Tool for CreateAppointment {
    fn name(&self) -> &'static str {
        "create_appointment"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Book a new appointment for the caller.",
            json!({
                "type": "object",
                "properties": {
                    "scheduled_date": {
                        "type": "string",
                        "description": "Appointment date and time, ISO 8601 (YYYY-MM-DDTHH:MM) in the business's local time"
                    },
                    "service_type": {"type": "string", "description": "Service being booked"},
                    "caller_name": {"type": "string", "description": "Caller's name"},
                    "notes": {"type": "string", "description": "Anything else the business should know"}
                },
                "required": ["scheduled_date"]
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: CreateArgs = decode_args(args)?;
        let tz = business_tz(business);
        let scheduled_at = parse_local_datetime(&args.scheduled_date, tz).ok_or_else(|| {
            ToolError::InvalidArguments(format!("unrecognized date: {}", args.scheduled_date))
        })?;
        let code = confirmation_code(Utc::now());

        let business_id = business.id.clone();
        let contact_id = ctx.contact_id.clone();
        let stored_code = code.clone();
        let appointment = ctx
            .with_conn(move |conn| {
                appointments::create_appointment(
                    conn,
                    &NewAppointment {
                        business_id: &business_id,
                        contact_id: contact_id.as_deref(),
                        scheduled_at,
                        service_type: args.service_type.as_deref(),
                        caller_name: args.caller_name.as_deref(),
                        notes: args.notes.as_deref(),
                        confirmation_code: &stored_code,
                    },
                )
            })
            .await?;

        let when = describe_local(scheduled_at, tz);
        let service = appointment.service_type.as_deref().unwrap_or("appointment");
        tracing::info!(
            session_id = %ctx.session_id,
            appointment_id = %appointment.id,
            confirmation_code = %code,
            "appointment created"
        );

        let body = format!(
            "{}: your {} is booked for {}. Confirmation code {}.",
            business.name, service, when, code
        );
        let confirmation_sent = ctx.notify_caller(business, &body).await;

        Ok(json!({
            "success": true,
            "appointment_id": appointment.id,
            "confirmation_code": code,
            "scheduled_for": when,
            "confirmation_sent": confirmation_sent,
        }))
    }
}

#[derive(Deserialize)]
struct RescheduleArgs {
    new_date: String,
    #[serde(default)]
    reason: Option<String>,
}

pub struct RescheduleAppointment;

#[async_trait]
impl Tool for RescheduleAppointment {
    fn name(&self) -> &'static str {
        "reschedule_appointment"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Move the caller's next upcoming appointment to a new time.",
            json!({
                "type": "object",
                "properties": {
                    "new_date": {
                        "type": "string",
                        "description": "New date and time, ISO 8601 (YYYY-MM-DDTHH:MM) in the business's local time"
                    },
                    "reason": {"type": "string"}
                },
                "required": ["new_date"]
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: RescheduleArgs = decode_args(args)?;
        let tz = business_tz(business);
        let new_time = parse_local_datetime(&args.new_date, tz).ok_or_else(|| {
            ToolError::InvalidArguments(format!("unrecognized date: {}", args.new_date))
        })?;
        let Some(contact_id) = ctx.contact_id.clone() else {
            return Ok(nothing_found("reschedule"));
        };

        let business_id = business.id.clone();
        let now = Utc::now();
        let moved = ctx
            .with_conn(move |conn| {
                let Some(current) = appointments::next_upcoming(conn, &business_id, &contact_id, now)?
                else {
                    return Ok(None);
                };
                let updated = appointments::reschedule(
                    conn,
                    &business_id,
                    &current.id,
                    new_time,
                    args.reason.as_deref(),
                )?;
                Ok(Some((current, updated)))
            })
            .await?;

        let Some((previous, updated)) = moved else {
            return Ok(nothing_found("reschedule"));
        };

        let when = describe_local(new_time, tz);
        let was = previous
            .scheduled_at_utc()
            .map(|at| describe_local(at, tz))
            .unwrap_or(previous.scheduled_at.clone());
        tracing::info!(session_id = %ctx.session_id, appointment_id = %updated.id, "appointment rescheduled");

        let body = format!(
            "{}: your appointment has been moved to {}. Confirmation code {}.",
            business.name, when, updated.confirmation_code
        );
        let confirmation_sent = ctx.notify_caller(business, &body).await;

        Ok(json!({
            "success": true,
            "found": true,
            "appointment_id": updated.id,
            "previous_time": was,
            "new_time": when,
            "confirmation_code": updated.confirmation_code,
            "confirmation_sent": confirmation_sent,
        }))
    }
}

#[derive(Deserialize)]
struct CancelArgs {
    #[serde(default)]
    reason: Option<String>,
}

pub struct CancelAppointment;

#[async_trait]
impl Tool for CancelAppointment {
    fn name(&self) -> &'static str {
        "cancel_appointment"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Cancel the caller's next upcoming appointment.",
            json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string"}
                }
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: CancelArgs = decode_args(args)?;
        let Some(contact_id) = ctx.contact_id.clone() else {
            return Ok(nothing_found("cancel"));
        };

        let business_id = business.id.clone();
        let now = Utc::now();
        let cancelled = ctx
            .with_conn(move |conn| {
                match appointments::next_upcoming(conn, &business_id, &contact_id, now)? {
                    Some(current) => appointments::cancel(
                        conn,
                        &business_id,
                        &current.id,
                        args.reason.as_deref(),
                    )
                    .map(Some),
                    None => Ok(None),
                }
            })
            .await?;

        let Some(cancelled) = cancelled else {
            return Ok(nothing_found("cancel"));
        };

        let tz = business_tz(business);
        let when = cancelled
            .scheduled_at_utc()
            .map(|at| describe_local(at, tz))
            .unwrap_or(cancelled.scheduled_at.clone());
        tracing::info!(session_id = %ctx.session_id, appointment_id = %cancelled.id, "appointment cancelled");

        let body = format!(
            "{}: your appointment on {} has been cancelled.",
            business.name, when
        );
        let confirmation_sent = ctx.notify_caller(business, &body).await;

        Ok(json!({
            "success": true,
            "found": true,
            "appointment_id": cancelled.id,
            "cancelled_time": when,
            "confirmation_sent": confirmation_sent,
        }))
    }
}
