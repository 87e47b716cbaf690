use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BeaconError;
use crate::models::SessionMetadata;

/// One call into the backend, named the way the widget invokes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function")]
pub enum WidgetRequest {
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "health")]
    Health,
    #[serde(rename = "organization.validate", rename_all = "camelCase")]
    ValidateOrganization { organization_id: String },
    #[serde(rename = "contactSession.create", rename_all = "camelCase")]
    CreateContactSession {
        name: String,
        email: String,
        organization_id: String,
        #[serde(default)]
        metadata: Option<SessionMetadata>,
    },
    #[serde(rename = "contactSession.validate", rename_all = "camelCase")]
    ValidateContactSession { contact_session_id: Uuid },
    #[serde(rename = "conversation.create", rename_all = "camelCase")]
    CreateConversation {
        organization_id: String,
        contact_session_id: Uuid,
    },
    #[serde(rename = "conversation.getOne", rename_all = "camelCase")]
    GetConversation {
        conversation_id: Uuid,
        contact_session_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Discriminated failure code (`UNAUTHORIZED`, `NOT_FOUND`, ...).
    #[serde(default)]
    pub code: Option<String>,
    pub version: String,
}

impl WidgetResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            code: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(code: &str, msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            code: Some(code.to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

impl From<BeaconError> for WidgetResponse {
    fn from(e: BeaconError) -> Self {
        WidgetResponse::err(e.code(), e.to_string())
    }
}
