use beacon_core::error::{CODE_NOT_FOUND, CODE_UNAUTHORIZED};
use thiserror::Error;

use crate::auth::FormErrors;

#[derive(Error, Debug)]
pub enum WidgetError {
    /// The backend answered with a coded failure.
    #[error("{message}")]
    Remote { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidForm(#[from] FormErrors),

    #[error("No organization selected")]
    MissingOrganization,

    #[error("No contact session for this organization")]
    MissingSession,
}

impl WidgetError {
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code() == Some(CODE_UNAUTHORIZED)
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(CODE_NOT_FOUND)
    }
}

pub type Result<T> = std::result::Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_codes() {
        let err = WidgetError::remote("UNAUTHORIZED", "Invalid session");
        assert!(err.is_unauthorized());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Invalid session");

        assert!(WidgetError::remote("NOT_FOUND", "gone").is_not_found());
        assert_eq!(WidgetError::MissingSession.code(), None);
    }
}
