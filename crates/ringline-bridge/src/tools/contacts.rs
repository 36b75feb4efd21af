use super::{decode_args, function_schema, Tool, ToolContext, ToolError};
use async_trait::async_trait;
use ringline_store::contacts::{self, ContactUpdate};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct UpdateArgs {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Partial contact update. Fields the model did not send are left alone.
pub struct UpdateContactInfo;

#[async_trait]
impl Tool for UpdateContactInfo {
    fn name(&self) -> &'static str {
        "update_contact_info"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Update the caller's contact details. Only include fields the caller provided.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "email": {"type": "string"},
                    "notes": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: UpdateArgs = decode_args(args)?;

        let Some(contact_id) = ctx.contact_id.clone() else {
            return Ok(json!({
                "success": true,
                "updated": false,
                "message": "No contact record is linked to this call, so nothing was saved.",
            }));
        };

        let update = ContactUpdate {
            name: args.name,
            email: args.email,
            notes: args.notes,
            tags: args.tags,
        };
        if update.is_empty() {
            return Ok(json!({
                "success": true,
                "updated": false,
                "message": "No fields were provided to update.",
            }));
        }

        let fields = update.field_names();
        let business_id = business.id.clone();
        let changed = ctx
            .with_conn(move |conn| contacts::update_contact(conn, &business_id, &contact_id, &update))
            .await?;
        tracing::info!(session_id = %ctx.session_id, fields = ?fields, "contact updated");

        Ok(json!({
            "success": true,
            "updated": changed > 0,
            "fields": fields,
        }))
    }
}
