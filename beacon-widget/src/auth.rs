//! Auth screen: collect name and email, create a contact session, persist it.

use std::fmt;

use beacon_core::models::{is_valid_email, NewContactSession, SessionMetadata};
use chrono::{Local, Offset};
use uuid::Uuid;

use crate::backend::WidgetBackend;
use crate::error::{Result, WidgetError};
use crate::screen::Screen;
use crate::storage::SessionStore;

pub const MSG_NAME_REQUIRED: &str = "Name is required";
pub const MSG_EMAIL_REQUIRED: &str = "Email is required";
pub const MSG_EMAIL_INVALID: &str = "Not a valid email";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormErrors(pub Vec<FieldError>);

impl FormErrors {
    pub fn message_for(&self, field: Field) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for FormErrors {}

impl AuthForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// One message per field, the first rule that fails.
    pub fn validate(&self) -> std::result::Result<(), FormErrors> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError {
                field: Field::Name,
                message: MSG_NAME_REQUIRED,
            });
        }
        let email = self.email.trim();
        if email.is_empty() {
            errors.push(FieldError {
                field: Field::Email,
                message: MSG_EMAIL_REQUIRED,
            });
        } else if !is_valid_email(email) {
            errors.push(FieldError {
                field: Field::Email,
                message: MSG_EMAIL_INVALID,
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FormErrors(errors))
        }
    }
}

/// Describe the host environment the way a browser would report it.
pub fn detect_metadata() -> SessionMetadata {
    let language = std::env::var("LANG")
        .ok()
        .map(|lang| lang.split('.').next().unwrap_or_default().replace('_', "-"))
        .filter(|lang| !lang.is_empty());
    let languages = std::env::var("LANGUAGE")
        .ok()
        .filter(|l| !l.is_empty())
        .map(|l| l.replace(':', ","));
    let screen_resolution = match (std::env::var("COLUMNS"), std::env::var("LINES")) {
        (Ok(cols), Ok(lines)) => Some(format!("{}x{}", cols, lines)),
        _ => None,
    };
    // Minutes to add to local time to reach UTC, as getTimezoneOffset reports it.
    let offset_seconds = Local::now().offset().fix().local_minus_utc();

    SessionMetadata {
        user_agent: Some(format!(
            "beacon-widget/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )),
        language,
        languages,
        platform: Some(std::env::consts::OS.to_string()),
        vendor: None,
        screen_resolution,
        timezone: std::env::var("TZ").ok().filter(|tz| !tz.is_empty()),
        timezone_offset: Some(-offset_seconds / 60),
        cookie_enabled: Some(true),
    }
}

/// Validate the form, create the session for the current organization,
/// persist its id and move to the selection screen.
pub async fn submit(
    backend: &dyn WidgetBackend,
    store: &SessionStore,
    form: &AuthForm,
    metadata: SessionMetadata,
) -> Result<Uuid> {
    let organization_id = store
        .organization_id()
        .ok_or(WidgetError::MissingOrganization)?;
    form.validate()?;

    let contact_session_id = backend
        .create_contact_session(NewContactSession {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            organization_id: organization_id.clone(),
            metadata: Some(metadata),
        })
        .await?;

    store.set(&organization_id, contact_session_id)?;
    store.set_screen(Screen::Selection);
    tracing::info!(%organization_id, %contact_session_id, "Contact session established");
    Ok(contact_session_id)
}
