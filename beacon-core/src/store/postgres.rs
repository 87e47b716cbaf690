use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::SupportStore;
use crate::error::{BeaconError, Result};
use crate::models::{
    ContactSession, ContactSessionDraft, Conversation, ConversationDraft, SessionMetadata,
};

#[derive(Debug, sqlx::FromRow)]
struct ContactSessionRow {
    id: Uuid,
    name: String,
    email: String,
    organization_id: String,
    created_at: i64,
    expires_at: i64,
    metadata: Option<serde_json::Value>,
}

impl TryFrom<ContactSessionRow> for ContactSession {
    type Error = BeaconError;

    fn try_from(row: ContactSessionRow) -> Result<Self> {
        let metadata = row
            .metadata
            .map(serde_json::from_value::<SessionMetadata>)
            .transpose()
            .map_err(|e| BeaconError::Other(format!("corrupt session metadata: {}", e)))?;
        Ok(ContactSession {
            id: row.id,
            name: row.name,
            email: row.email,
            organization_id: row.organization_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            metadata,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    thread_id: String,
    organization_id: String,
    contact_session_id: Uuid,
    status: String,
    created_at: i64,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = BeaconError;

    fn try_from(row: ConversationRow) -> Result<Self> {
        Ok(Conversation {
            id: row.id,
            thread_id: row.thread_id,
            organization_id: row.organization_id,
            contact_session_id: row.contact_session_id,
            status: row.status.parse().map_err(BeaconError::Other)?,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed store. Ids come from `gen_random_uuid()` column defaults.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SupportStore for PgStore {
    async fn insert_contact_session(&self, draft: ContactSessionDraft) -> Result<ContactSession> {
        let metadata = draft
            .metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| BeaconError::Other(format!("unserializable metadata: {}", e)))?;

        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO contact_sessions (name, email, organization_id, created_at, expires_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.organization_id)
        .bind(draft.created_at)
        .bind(draft.expires_at)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(draft.into_session(row.0))
    }

    async fn get_contact_session(&self, id: Uuid) -> Result<Option<ContactSession>> {
        let row = sqlx::query_as::<_, ContactSessionRow>(
            r#"
            SELECT id, name, email, organization_id, created_at, expires_at, metadata
            FROM contact_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContactSession::try_from).transpose()
    }

    async fn insert_conversation(&self, draft: ConversationDraft) -> Result<Conversation> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO conversations (thread_id, organization_id, contact_session_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&draft.thread_id)
        .bind(&draft.organization_id)
        .bind(draft.contact_session_id)
        .bind(draft.status.as_str())
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(draft.into_conversation(row.0))
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, thread_id, organization_id, contact_session_id, status, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Conversation::try_from).transpose()
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
