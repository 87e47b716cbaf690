use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Unresolved,
    Escalated,
    Resolved,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Unresolved => "unresolved",
            ConversationStatus::Escalated => "escalated",
            ConversationStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unresolved" => Ok(ConversationStatus::Unresolved),
            "escalated" => Ok(ConversationStatus::Escalated),
            "resolved" => Ok(ConversationStatus::Resolved),
            other => Err(format!("unknown conversation status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub thread_id: String,
    pub organization_id: String,
    pub contact_session_id: Uuid,
    pub status: ConversationStatus,
    pub created_at: i64,
}

/// A conversation ready for insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationDraft {
    pub thread_id: String,
    pub organization_id: String,
    pub contact_session_id: Uuid,
    pub status: ConversationStatus,
    pub created_at: i64,
}

impl ConversationDraft {
    pub fn into_conversation(self, id: Uuid) -> Conversation {
        Conversation {
            id,
            thread_id: self.thread_id,
            organization_id: self.organization_id,
            contact_session_id: self.contact_session_id,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// What `conversation.getOne` hands back to the widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub status: ConversationStatus,
    pub thread_id: String,
}

impl From<&Conversation> for ConversationView {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            status: conversation.status,
            thread_id: conversation.thread_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            ConversationStatus::Unresolved,
            ConversationStatus::Escalated,
            ConversationStatus::Resolved,
        ] {
            assert_eq!(status.as_str().parse::<ConversationStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("closed".parse::<ConversationStatus>().is_err());
    }

    #[test]
    fn test_default_status_is_unresolved() {
        assert_eq!(ConversationStatus::default(), ConversationStatus::Unresolved);
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let id = Uuid::new_v4();
        let view = ConversationView {
            id,
            status: ConversationStatus::Escalated,
            thread_id: "thread_9".to_string(),
        };
        let body = serde_json::to_value(&view).unwrap();
        assert_eq!(body["threadId"], "thread_9");
        assert_eq!(body["status"], "escalated");
        assert_eq!(body["id"], id.to_string());
    }
}
