use thiserror::Error;

use crate::agent::AgentError;
use crate::organization::DirectoryError;

/// Wire code for a rejected caller (bad, expired or foreign session).
pub const CODE_UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";
pub const CODE_BAD_REQUEST: &str = "BAD_REQUEST";
pub const CODE_INTERNAL: &str = "INTERNAL";

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Organization directory error: {0}")]
    Organization(#[from] DirectoryError),

    #[error("Other error: {0}")]
    Other(String),
}

impl BeaconError {
    /// Discriminated code carried on the wire alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            BeaconError::Unauthorized(_) => CODE_UNAUTHORIZED,
            BeaconError::NotFound(_) => CODE_NOT_FOUND,
            BeaconError::InvalidInput(_) => CODE_BAD_REQUEST,
            _ => CODE_INTERNAL,
        }
    }
}

pub type Result<T> = std::result::Result<T, BeaconError>;
