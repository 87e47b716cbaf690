//! Scriptable backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use beacon_core::models::{
    ContactSession, ContactSessionDraft, ConversationStatus, ConversationView, NewContactSession,
    SessionValidation,
};
use beacon_core::OrganizationCheck;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::backend::WidgetBackend;
use crate::error::{Result, WidgetError};

#[derive(Default)]
pub(crate) struct FakeBackend {
    organizations: HashMap<String, OrganizationCheck>,
    sessions: HashMap<Uuid, SessionValidation>,
    failing_sessions: HashSet<Uuid>,
    held_organization: Option<String>,
    conversation_failure: Option<(String, String)>,
    pub created_sessions: Mutex<Vec<NewContactSession>>,
    pub conversations: Mutex<Vec<(String, Uuid, Uuid)>>,
    pub org_calls: AtomicUsize,
    pub session_calls: AtomicUsize,
    pub entered: Notify,
    pub release: Notify,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_session(organization_id: &str) -> ContactSession {
        let input = NewContactSession {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            organization_id: organization_id.to_string(),
            metadata: None,
        };
        ContactSessionDraft::new(input, 0).into_session(Uuid::new_v4())
    }

    pub fn with_organization(self, organization_id: &str) -> Self {
        self.with_organization_check(organization_id, OrganizationCheck::valid())
    }

    pub fn with_organization_check(
        mut self,
        organization_id: &str,
        check: OrganizationCheck,
    ) -> Self {
        self.organizations.insert(organization_id.to_string(), check);
        self
    }

    pub fn with_session(mut self, id: Uuid, validation: SessionValidation) -> Self {
        self.sessions.insert(id, validation);
        self
    }

    pub fn failing_session(mut self, id: Uuid) -> Self {
        self.failing_sessions.insert(id);
        self
    }

    /// Park validation of `organization_id` until `release` is notified.
    pub fn hold_organization(mut self, organization_id: &str) -> Self {
        self.held_organization = Some(organization_id.to_string());
        self
    }

    pub fn failing_conversations(mut self, code: &str, message: &str) -> Self {
        self.conversation_failure = Some((code.to_string(), message.to_string()));
        self
    }
}

#[async_trait]
impl WidgetBackend for FakeBackend {
    async fn validate_organization(&self, organization_id: &str) -> Result<OrganizationCheck> {
        self.org_calls.fetch_add(1, Ordering::SeqCst);
        if self.held_organization.as_deref() == Some(organization_id) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.organizations
            .get(organization_id)
            .cloned()
            .ok_or_else(|| WidgetError::remote("INTERNAL", "directory unavailable"))
    }

    async fn create_contact_session(&self, input: NewContactSession) -> Result<Uuid> {
        self.created_sessions.lock().unwrap().push(input);
        Ok(Uuid::new_v4())
    }

    async fn validate_contact_session(
        &self,
        contact_session_id: Uuid,
    ) -> Result<SessionValidation> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_sessions.contains(&contact_session_id) {
            return Err(WidgetError::remote("INTERNAL", "database unavailable"));
        }
        Ok(self
            .sessions
            .get(&contact_session_id)
            .cloned()
            .unwrap_or_else(SessionValidation::not_found))
    }

    async fn create_conversation(
        &self,
        organization_id: &str,
        contact_session_id: Uuid,
    ) -> Result<Uuid> {
        if let Some((code, message)) = &self.conversation_failure {
            return Err(WidgetError::remote(code.clone(), message.clone()));
        }
        let id = Uuid::new_v4();
        self.conversations
            .lock()
            .unwrap()
            .push((organization_id.to_string(), contact_session_id, id));
        Ok(id)
    }

    async fn get_conversation(
        &self,
        conversation_id: Uuid,
        contact_session_id: Uuid,
    ) -> Result<ConversationView> {
        let conversations = self.conversations.lock().unwrap();
        match conversations.iter().find(|(_, _, id)| *id == conversation_id) {
            Some((_, owner, _)) if *owner == contact_session_id => Ok(ConversationView {
                id: conversation_id,
                status: ConversationStatus::Unresolved,
                thread_id: "thread_fake".to_string(),
            }),
            Some(_) => Err(WidgetError::remote("UNAUTHORIZED", "Incorrect session")),
            None => Err(WidgetError::remote("NOT_FOUND", "Conversation not found")),
        }
    }
}
