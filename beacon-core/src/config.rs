use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct BeaconConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub organizations: OrganizationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Which persistence backend holds sessions and conversations.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8780,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentBackend {
    Http,
    #[default]
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub backend: AgentBackend,
    pub base_url: String,
    pub api_key: Option<String>,
    pub greeting: String,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend: AgentBackend::Memory,
            base_url: "http://127.0.0.1:8790".to_string(),
            api_key: None,
            greeting: crate::agent::DEFAULT_GREETING.to_string(),
            max_retries: 3,
            retry_delay_ms: 500,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryBackend {
    #[default]
    Static,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OrganizationsConfig {
    pub backend: DirectoryBackend,
    /// Known organizations for the static directory.
    pub allowed: Vec<String>,
    /// Known but disabled organizations for the static directory.
    pub disabled: Vec<String>,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for OrganizationsConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Static,
            allowed: Vec::new(),
            disabled: Vec::new(),
            base_url: "http://127.0.0.1:8791".to_string(),
            api_key: None,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl BeaconConfig {
    /// Load from a TOML file, then apply `BEACON__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("BEACON").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }
}
