//! Persistence for contact sessions and conversations.
//!
//! Every method is a single atomic unit against the backing store. Ids are
//! assigned by the store and are unique under concurrent creation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ContactSession, ContactSessionDraft, Conversation, ConversationDraft};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait SupportStore: Send + Sync {
    async fn insert_contact_session(&self, draft: ContactSessionDraft) -> Result<ContactSession>;

    async fn get_contact_session(&self, id: Uuid) -> Result<Option<ContactSession>>;

    async fn insert_conversation(&self, draft: ConversationDraft) -> Result<Conversation>;

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
