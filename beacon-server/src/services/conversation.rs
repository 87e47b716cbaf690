//! Conversation lifecycle: create behind a live session, read behind ownership.

use std::sync::Arc;

use beacon_core::error::{BeaconError, Result};
use beacon_core::models::{ContactSession, ConversationDraft, ConversationStatus, ConversationView};
use beacon_core::{AgentThreads, Clock, MessageRole, SupportStore};
use uuid::Uuid;

#[derive(Clone)]
pub struct ConversationService {
    store: Arc<dyn SupportStore>,
    threads: Arc<dyn AgentThreads>,
    clock: Arc<dyn Clock>,
    greeting: String,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn SupportStore>,
        threads: Arc<dyn AgentThreads>,
        clock: Arc<dyn Clock>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            store,
            threads,
            clock,
            greeting: greeting.into(),
        }
    }

    /// Open a thread, seed it with the greeting, then insert the conversation.
    ///
    /// Expiry is checked once, before the thread call; a session expiring
    /// while the agent service is slow still gets its conversation.
    pub async fn create(&self, organization_id: &str, contact_session_id: Uuid) -> Result<Uuid> {
        let session = self.live_session(contact_session_id).await?;

        if session.organization_id != organization_id {
            tracing::warn!(
                %contact_session_id,
                session_org = %session.organization_id,
                requested_org = %organization_id,
                "Rejected conversation for a session of another organization"
            );
            return Err(BeaconError::Unauthorized("Invalid session".to_string()));
        }

        let thread_id = self.threads.create_thread(organization_id).await?;
        self.threads
            .save_message(&thread_id, MessageRole::Assistant, &self.greeting)
            .await?;

        let conversation = self
            .store
            .insert_conversation(ConversationDraft {
                thread_id,
                organization_id: organization_id.to_string(),
                contact_session_id: session.id,
                status: ConversationStatus::Unresolved,
                created_at: self.clock.now_millis(),
            })
            .await?;

        tracing::info!(
            conversation_id = %conversation.id,
            %contact_session_id,
            thread_id = %conversation.thread_id,
            "Conversation created"
        );
        Ok(conversation.id)
    }

    /// Session ownership is the only authorization check.
    pub async fn get_one(
        &self,
        conversation_id: Uuid,
        contact_session_id: Uuid,
    ) -> Result<ConversationView> {
        let session = self.live_session(contact_session_id).await?;

        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| BeaconError::NotFound("Conversation not found".to_string()))?;

        if conversation.contact_session_id != session.id {
            tracing::warn!(
                %conversation_id,
                %contact_session_id,
                "Rejected read of a conversation owned by another session"
            );
            return Err(BeaconError::Unauthorized("Incorrect session".to_string()));
        }

        Ok(ConversationView::from(&conversation))
    }

    async fn live_session(&self, contact_session_id: Uuid) -> Result<ContactSession> {
        match self.store.get_contact_session(contact_session_id).await? {
            Some(session) if !session.is_expired_at(self.clock.now_millis()) => Ok(session),
            _ => {
                tracing::warn!(%contact_session_id, "Missing or expired contact session");
                Err(BeaconError::Unauthorized("Invalid session".to_string()))
            }
        }
    }
}
