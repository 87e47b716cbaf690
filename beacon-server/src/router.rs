use beacon_core::error::CODE_INTERNAL;
use beacon_core::ipc::{WidgetRequest, WidgetResponse};
use beacon_core::models::NewContactSession;

use crate::services::Services;

/// Dispatch one widget call to its service. Every failure comes back as an
/// error response carrying its code; nothing is raised past this point.
pub async fn handle_request(request: WidgetRequest, services: &Services) -> WidgetResponse {
    match request {
        WidgetRequest::Ping => WidgetResponse::pong(),
        WidgetRequest::Health => handle_health(services).await,
        WidgetRequest::ValidateOrganization { organization_id } => {
            match services.organizations.validate(&organization_id).await {
                Ok(check) => to_response(&check),
                Err(e) => {
                    tracing::warn!(%organization_id, error = %e, "Organization validation failed");
                    WidgetResponse::err(
                        CODE_INTERNAL,
                        format!("Unable to verify organization: {}", e),
                    )
                }
            }
        }
        WidgetRequest::CreateContactSession {
            name,
            email,
            organization_id,
            metadata,
        } => {
            let input = NewContactSession {
                name,
                email,
                organization_id,
                metadata,
            };
            match services.contact_sessions.create(input).await {
                Ok(id) => WidgetResponse::ok(serde_json::json!({ "contactSessionId": id })),
                Err(e) => e.into(),
            }
        }
        WidgetRequest::ValidateContactSession { contact_session_id } => {
            match services.contact_sessions.validate(contact_session_id).await {
                Ok(validation) => to_response(&validation),
                Err(e) => e.into(),
            }
        }
        WidgetRequest::CreateConversation {
            organization_id,
            contact_session_id,
        } => match services
            .conversations
            .create(&organization_id, contact_session_id)
            .await
        {
            Ok(id) => WidgetResponse::ok(serde_json::json!({ "conversationId": id })),
            Err(e) => e.into(),
        },
        WidgetRequest::GetConversation {
            conversation_id,
            contact_session_id,
        } => match services
            .conversations
            .get_one(conversation_id, contact_session_id)
            .await
        {
            Ok(view) => to_response(&view),
            Err(e) => e.into(),
        },
    }
}

async fn handle_health(services: &Services) -> WidgetResponse {
    let Some(pool) = &services.pool else {
        return WidgetResponse::ok(serde_json::json!({
            "store": services.store_name,
            "status": "healthy"
        }));
    };
    match beacon_core::db::health_check(pool).await {
        Ok(pg_ver) => WidgetResponse::ok(serde_json::json!({
            "store": services.store_name,
            "postgresql": pg_ver,
            "status": "healthy"
        })),
        Err(e) => WidgetResponse::err(CODE_INTERNAL, format!("DB Health Check failed: {}", e)),
    }
}

fn to_response<T: serde::Serialize>(value: &T) -> WidgetResponse {
    match serde_json::to_value(value) {
        Ok(data) => WidgetResponse::ok(data),
        Err(e) => WidgetResponse::err(CODE_INTERNAL, format!("Serialization error: {}", e)),
    }
}
