//! Backend services and their wiring.

pub mod contact_session;
pub mod conversation;

use std::sync::Arc;

use beacon_core::config::{AgentBackend, DirectoryBackend, StoreBackend};
use beacon_core::{
    AgentThreads, BeaconConfig, Clock, HttpAgentThreads, HttpOrganizationDirectory,
    InMemoryAgentThreads, MemoryStore, OrganizationDirectory, PgStore,
    StaticOrganizationDirectory, SupportStore, SystemClock,
};
use sqlx::PgPool;

pub use contact_session::ContactSessionService;
pub use conversation::ConversationService;

/// Everything a request handler needs, cheap to clone.
#[derive(Clone)]
pub struct Services {
    pub contact_sessions: ContactSessionService,
    pub conversations: ConversationService,
    pub organizations: Arc<dyn OrganizationDirectory>,
    /// Present when the store is Postgres; used by health checks.
    pub pool: Option<PgPool>,
    pub store_name: String,
}

impl Services {
    pub fn new(
        store: Arc<dyn SupportStore>,
        threads: Arc<dyn AgentThreads>,
        organizations: Arc<dyn OrganizationDirectory>,
        clock: Arc<dyn Clock>,
        greeting: &str,
    ) -> Self {
        Self {
            contact_sessions: ContactSessionService::new(store.clone(), clock.clone()),
            conversations: ConversationService::new(store.clone(), threads, clock, greeting),
            organizations,
            pool: None,
            store_name: store.name().to_string(),
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Build the configured store and collaborators. `pool` is required for
    /// the Postgres store and ignored otherwise.
    pub fn from_config(config: &BeaconConfig, pool: Option<PgPool>) -> anyhow::Result<Self> {
        let store: Arc<dyn SupportStore> = match (config.store.backend, &pool) {
            (StoreBackend::Postgres, Some(pool)) => Arc::new(PgStore::new(pool.clone())),
            (StoreBackend::Postgres, None) => {
                anyhow::bail!("postgres store selected but no database pool available")
            }
            (StoreBackend::Memory, _) => Arc::new(MemoryStore::new()),
        };

        let threads: Arc<dyn AgentThreads> = match config.agent.backend {
            AgentBackend::Http => Arc::new(HttpAgentThreads::new(&config.agent)?),
            AgentBackend::Memory => Arc::new(InMemoryAgentThreads::new()),
        };

        let organizations: Arc<dyn OrganizationDirectory> = match config.organizations.backend {
            DirectoryBackend::Http => {
                Arc::new(HttpOrganizationDirectory::new(&config.organizations)?)
            }
            DirectoryBackend::Static => {
                Arc::new(StaticOrganizationDirectory::from_config(&config.organizations))
            }
        };

        tracing::info!(
            store = store.name(),
            agent = threads.name(),
            organizations = organizations.name(),
            "Services configured"
        );

        let services = Self::new(
            store,
            threads,
            organizations,
            Arc::new(SystemClock),
            &config.agent.greeting,
        );
        Ok(match (config.store.backend, pool) {
            (StoreBackend::Postgres, Some(pool)) => services.with_pool(pool),
            _ => services,
        })
    }
}
