use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of a contact session, fixed at creation (24 hours).
pub const SESSION_DURATION_MS: i64 = 24 * 60 * 60 * 1000;

pub const REASON_NOT_FOUND: &str = "Not found";
pub const REASON_EXPIRED: &str = "Contact session expired";

/// Loose syntactic check: something@something.tld with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex"))
        .is_match(email)
}

/// Browser/environment details captured when the visitor authenticates.
/// Informational only; nothing here is validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    pub language: Option<String>,
    pub languages: Option<String>,
    pub platform: Option<String>,
    pub vendor: Option<String>,
    pub screen_resolution: Option<String>,
    pub timezone: Option<String>,
    pub timezone_offset: Option<i32>,
    pub cookie_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSession {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub organization_id: String,
    pub created_at: i64,
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SessionMetadata>,
}

impl ContactSession {
    /// A session is live strictly before its deadline.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

/// Input to `contactSession.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactSession {
    pub name: String,
    pub email: String,
    pub organization_id: String,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

/// A session ready for insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSessionDraft {
    pub name: String,
    pub email: String,
    pub organization_id: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub metadata: Option<SessionMetadata>,
}

impl ContactSessionDraft {
    pub fn new(input: NewContactSession, now_ms: i64) -> Self {
        Self {
            name: input.name,
            email: input.email,
            organization_id: input.organization_id,
            created_at: now_ms,
            expires_at: now_ms + SESSION_DURATION_MS,
            metadata: input.metadata,
        }
    }

    pub fn into_session(self, id: Uuid) -> ContactSession {
        ContactSession {
            id,
            name: self.name,
            email: self.email,
            organization_id: self.organization_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            metadata: self.metadata,
        }
    }
}

/// Soft result of `contactSession.validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<ContactSession>,
}

impl SessionValidation {
    pub fn valid(session: ContactSession) -> Self {
        Self {
            valid: true,
            reason: None,
            session: Some(session),
        }
    }

    pub fn not_found() -> Self {
        Self {
            valid: false,
            reason: Some(REASON_NOT_FOUND.to_string()),
            session: None,
        }
    }

    pub fn expired() -> Self {
        Self {
            valid: false,
            reason: Some(REASON_EXPIRED.to_string()),
            session: None,
        }
    }
}
