//! Client side of the support widget: persisted session slots, the backend
//! client, the bootstrap state machine and the screens it routes between.

pub mod auth;
pub mod backend;
pub mod bootstrap;
pub mod conversation;
pub mod error;
pub mod screen;
pub mod storage;
pub mod voice;

#[cfg(test)]
mod testing;

pub use backend::{HttpWidgetBackend, WidgetBackend};
pub use bootstrap::{BootstrapController, BootstrapOutcome};
pub use error::WidgetError;
pub use screen::Screen;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, SessionStore};

/// Where the widget talks to and where it keeps its persisted slots.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub server_url: String,
    pub storage_path: std::path::PathBuf,
}
