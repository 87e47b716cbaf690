//! Selection screen → chat: open a conversation for the stored session.

use beacon_core::models::ConversationView;
use uuid::Uuid;

use crate::backend::WidgetBackend;
use crate::error::{Result, WidgetError};
use crate::screen::Screen;
use crate::storage::SessionStore;

pub const MSG_STARTING_CONVERSATION: &str = "Starting conversation...";

fn current_session(store: &SessionStore) -> Result<(String, Uuid)> {
    let organization_id = store
        .organization_id()
        .ok_or(WidgetError::MissingOrganization)?;
    match store.get(&organization_id)? {
        Some(id) => Ok((organization_id, id)),
        None => {
            store.set_screen(Screen::Auth);
            Err(WidgetError::MissingSession)
        }
    }
}

/// Create a conversation and switch to the chat screen. A rejected session
/// sends the visitor back to auth.
pub async fn start(backend: &dyn WidgetBackend, store: &SessionStore) -> Result<Uuid> {
    let (organization_id, contact_session_id) = current_session(store)?;

    store.set_loading_message(MSG_STARTING_CONVERSATION);
    match backend
        .create_conversation(&organization_id, contact_session_id)
        .await
    {
        Ok(conversation_id) => {
            store.set_conversation_id(Some(conversation_id));
            store.set_screen(Screen::Chat);
            tracing::info!(%conversation_id, %contact_session_id, "Conversation started");
            Ok(conversation_id)
        }
        Err(e) => {
            if e.is_unauthorized() {
                tracing::warn!(%contact_session_id, "Session rejected, back to auth");
                store.set_screen(Screen::Auth);
            }
            Err(e)
        }
    }
}

/// Fetch the conversation the chat screen has open. A conversation the
/// server no longer knows is dropped and the visitor returns to selection.
pub async fn current(
    backend: &dyn WidgetBackend,
    store: &SessionStore,
) -> Result<ConversationView> {
    let (_, contact_session_id) = current_session(store)?;
    let conversation_id = store
        .conversation_id()
        .ok_or_else(|| WidgetError::remote("NOT_FOUND", "No conversation open"))?;
    let view = backend
        .get_conversation(conversation_id, contact_session_id)
        .await;
    if let Err(e) = &view {
        if e.is_unauthorized() {
            store.set_conversation_id(None);
            store.set_screen(Screen::Auth);
        } else if e.is_not_found() {
            tracing::warn!(%conversation_id, "Open conversation no longer exists");
            store.set_conversation_id(None);
            store.set_screen(Screen::Selection);
        }
    }
    view
}
