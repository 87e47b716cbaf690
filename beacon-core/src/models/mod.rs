pub mod contact_session;
pub mod conversation;

pub use contact_session::{
    is_valid_email, ContactSession, ContactSessionDraft, NewContactSession, SessionMetadata,
    SessionValidation, SESSION_DURATION_MS,
};
pub use conversation::{Conversation, ConversationDraft, ConversationStatus, ConversationView};
