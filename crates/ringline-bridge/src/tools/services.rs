use super::{decode_args, function_schema, Tool, ToolContext, ToolError};
use async_trait::async_trait;
use ringline_types::{BusinessConfig, ServiceInfo};
use serde::Deserialize;
use serde_json::{json, Value};

fn find_service<'a>(services: &'a [ServiceInfo], name: &str) -> Option<&'a ServiceInfo> {
    let wanted = name.trim().to_lowercase();
    services
        .iter()
        .find(|s| s.name.to_lowercase() == wanted)
        .or_else(|| {
            services
                .iter()
                .find(|s| s.name.to_lowercase().contains(&wanted))
        })
}

/// Looks up one service or lists them all.
///
/// An unknown name yields `success: false` with the full list so the model
/// can offer alternatives.
pub fn services_info(business: &BusinessConfig, service_name: Option<&str>) -> Value {
    let requested = service_name.map(str::trim).filter(|s| !s.is_empty());
    let Some(requested) = requested else {
        return json!({
            "success": true,
            "services": business.services,
        });
    };

    if let Some(service) = find_service(&business.services, requested) {
        return json!({
            "success": true,
            "service": service,
        });
    }

    let available = business.service_names();
    let message = if available.is_empty() {
        format!("We don't offer {}, and no services are listed.", requested)
    } else {
        format!(
            "We don't offer {}. Available services: {}.",
            requested,
            available.join(", ")
        )
    };
    json!({
        "success": false,
        "found": false,
        "requested": requested,
        "available_services": available,
        "message": message,
    })
}

#[derive(Deserialize)]
struct ServicesArgs {
    #[serde(default)]
    service_name: Option<String>,
}

pub struct GetServicesInfo;

#[async_trait]
impl Tool for GetServicesInfo {
    fn name(&self) -> &'static str {
        "get_services_info"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Describe the business's services, with prices and durations where known.",
            json!({
                "type": "object",
                "properties": {
                    "service_name": {"type": "string", "description": "A specific service to look up"}
                }
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: ServicesArgs = decode_args(args)?;
        tracing::debug!(session_id = %ctx.session_id, service = ?args.service_name, "service lookup");
        Ok(services_info(business, args.service_name.as_deref()))
    }
}
