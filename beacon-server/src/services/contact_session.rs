//! Contact session lifecycle: create with a fixed 24h expiry, validate lazily.

use std::sync::Arc;

use beacon_core::error::{BeaconError, Result};
use beacon_core::models::{
    is_valid_email, ContactSessionDraft, NewContactSession, SessionValidation,
};
use beacon_core::{Clock, SupportStore};
use uuid::Uuid;

#[derive(Clone)]
pub struct ContactSessionService {
    store: Arc<dyn SupportStore>,
    clock: Arc<dyn Clock>,
}

impl ContactSessionService {
    pub fn new(store: Arc<dyn SupportStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Insert a new session expiring one day from now. Repeated submissions
    /// with the same name/email create independent sessions.
    pub async fn create(&self, input: NewContactSession) -> Result<Uuid> {
        check_new_session(&input)?;

        let draft = ContactSessionDraft::new(input, self.clock.now_millis());
        let session = self.store.insert_contact_session(draft).await?;

        tracing::info!(
            contact_session_id = %session.id,
            organization_id = %session.organization_id,
            expires_at = session.expires_at,
            "Contact session created"
        );
        Ok(session.id)
    }

    /// Not-found and expired are reportable outcomes, never errors.
    pub async fn validate(&self, contact_session_id: Uuid) -> Result<SessionValidation> {
        let session = match self.store.get_contact_session(contact_session_id).await? {
            Some(s) => s,
            None => {
                tracing::debug!(%contact_session_id, "Contact session not found");
                return Ok(SessionValidation::not_found());
            }
        };

        if session.is_expired_at(self.clock.now_millis()) {
            tracing::debug!(%contact_session_id, "Contact session expired");
            return Ok(SessionValidation::expired());
        }

        Ok(SessionValidation::valid(session))
    }
}

fn check_new_session(input: &NewContactSession) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(BeaconError::InvalidInput("name is required".to_string()));
    }
    if input.email.trim().is_empty() {
        return Err(BeaconError::InvalidInput("email is required".to_string()));
    }
    if !is_valid_email(input.email.trim()) {
        return Err(BeaconError::InvalidInput("email is not valid".to_string()));
    }
    if input.organization_id.trim().is_empty() {
        return Err(BeaconError::InvalidInput(
            "organizationId is required".to_string(),
        ));
    }
    Ok(())
}
