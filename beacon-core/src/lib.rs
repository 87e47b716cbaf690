pub mod agent;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod models;
pub mod organization;
pub mod store;

pub use agent::{AgentError, AgentThreads, HttpAgentThreads, InMemoryAgentThreads, MessageRole};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BeaconConfig;
pub use error::BeaconError;
pub use organization::{
    DirectoryError, HttpOrganizationDirectory, OrganizationCheck, OrganizationDirectory,
    StaticOrganizationDirectory,
};
pub use store::{MemoryStore, PgStore, SupportStore};
