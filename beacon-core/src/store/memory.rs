use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::SupportStore;
use crate::error::Result;
use crate::models::{ContactSession, ContactSessionDraft, Conversation, ConversationDraft};

/// Process-local store for development and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<Uuid, ContactSession>>,
    conversations: RwLock<HashMap<Uuid, Conversation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contact_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl SupportStore for MemoryStore {
    async fn insert_contact_session(&self, draft: ContactSessionDraft) -> Result<ContactSession> {
        let mut sessions = self.sessions.write().await;
        loop {
            if let Entry::Vacant(slot) = sessions.entry(Uuid::new_v4()) {
                let session = draft.into_session(*slot.key());
                slot.insert(session.clone());
                return Ok(session);
            }
        }
    }

    async fn get_contact_session(&self, id: Uuid) -> Result<Option<ContactSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn insert_conversation(&self, draft: ConversationDraft) -> Result<Conversation> {
        let mut conversations = self.conversations.write().await;
        loop {
            if let Entry::Vacant(slot) = conversations.entry(Uuid::new_v4()) {
                let conversation = draft.into_conversation(*slot.key());
                slot.insert(conversation.clone());
                return Ok(conversation);
            }
        }
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(&id).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationStatus, NewContactSession};
    use std::sync::Arc;

    fn draft(now: i64) -> ContactSessionDraft {
        ContactSessionDraft::new(
            NewContactSession {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                organization_id: "org_1".to_string(),
                metadata: None,
            },
            now,
        )
    }

    #[tokio::test]
    async fn test_insert_then_get_session() {
        let store = MemoryStore::new();
        let session = store.insert_contact_session(draft(5)).await.unwrap();
        let loaded = store.get_contact_session(session.id).await.unwrap();
        assert_eq!(loaded, Some(session));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_none() {
        let store = MemoryStore::new();
        assert!(store.get_contact_session(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.get_conversation(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_distinct_ids() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_contact_session(draft(0)).await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 32);
        assert_eq!(store.contact_session_count().await, 32);
    }

    #[tokio::test]
    async fn test_insert_conversation() {
        let store = MemoryStore::new();
        let session = store.insert_contact_session(draft(0)).await.unwrap();
        let conversation = store
            .insert_conversation(ConversationDraft {
                thread_id: "thread_1".to_string(),
                organization_id: "org_1".to_string(),
                contact_session_id: session.id,
                status: ConversationStatus::Unresolved,
                created_at: 0,
            })
            .await
            .unwrap();
        let loaded = store.get_conversation(conversation.id).await.unwrap().unwrap();
        assert_eq!(loaded.contact_session_id, session.id);
        assert_eq!(store.conversation_count().await, 1);
    }
}
