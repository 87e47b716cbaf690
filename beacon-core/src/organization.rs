//! Organization directory — "does this organization exist and is it enabled".
//!
//! The identity-and-org provider is external. `HttpOrganizationDirectory`
//! talks to it; `StaticOrganizationDirectory` answers from configuration.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::OrganizationsConfig;

pub const REASON_UNKNOWN_ORGANIZATION: &str = "Organization not found";
pub const REASON_DISABLED_ORGANIZATION: &str = "Organization is disabled";

/// Soft result of `organization.validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationCheck {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OrganizationCheck {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },

    #[error("Invalid directory base URL: {0}")]
    InvalidBaseUrl(String),
}

impl DirectoryError {
    fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::Http(_) => true,
            DirectoryError::Api { code, .. } => {
                *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || *code >= 500
            }
            DirectoryError::RetryExhausted { .. } | DirectoryError::InvalidBaseUrl(_) => false,
        }
    }
}

#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    async fn validate(&self, organization_id: &str) -> Result<OrganizationCheck, DirectoryError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// StaticOrganizationDirectory
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StaticOrganizationDirectory {
    allowed: HashSet<String>,
    disabled: HashSet<String>,
}

impl StaticOrganizationDirectory {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            disabled: HashSet::new(),
        }
    }

    pub fn from_config(config: &OrganizationsConfig) -> Self {
        Self {
            allowed: config.allowed.iter().cloned().collect(),
            disabled: config.disabled.iter().cloned().collect(),
        }
    }

    pub fn with_disabled<I, S>(mut self, disabled: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(disabled.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl OrganizationDirectory for StaticOrganizationDirectory {
    async fn validate(&self, organization_id: &str) -> Result<OrganizationCheck, DirectoryError> {
        if self.disabled.contains(organization_id) {
            return Ok(OrganizationCheck::invalid(REASON_DISABLED_ORGANIZATION));
        }
        if self.allowed.contains(organization_id) {
            Ok(OrganizationCheck::valid())
        } else {
            Ok(OrganizationCheck::invalid(REASON_UNKNOWN_ORGANIZATION))
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ============================================================================
// HttpOrganizationDirectory
// ============================================================================

#[derive(Debug, Deserialize)]
struct OrganizationRecord {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct HttpOrganizationDirectory {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    max_retries: usize,
    retry_delay_ms: u64,
}

impl HttpOrganizationDirectory {
    pub fn new(config: &OrganizationsConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| DirectoryError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::InvalidBaseUrl(config.base_url.clone()));
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    async fn validate_once(
        &self,
        organization_id: &str,
    ) -> Result<OrganizationCheck, DirectoryError> {
        // The id is caller-supplied; it must stay a single encoded segment.
        if matches!(organization_id, "" | "." | "..") {
            return Ok(OrganizationCheck::invalid(REASON_UNKNOWN_ORGANIZATION));
        }
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["organizations", organization_id]);
        }

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(OrganizationCheck::invalid(REASON_UNKNOWN_ORGANIZATION));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(
                code = status.as_u16(),
                message = %message,
                "Organization directory error"
            );
            return Err(DirectoryError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let record: OrganizationRecord = response.json().await?;
        if record.enabled {
            Ok(OrganizationCheck::valid())
        } else {
            Ok(OrganizationCheck::invalid(REASON_DISABLED_ORGANIZATION))
        }
    }
}

#[async_trait]
impl OrganizationDirectory for HttpOrganizationDirectory {
    async fn validate(&self, organization_id: &str) -> Result<OrganizationCheck, DirectoryError> {
        let strategy = ExponentialBackoff::from_millis(self.retry_delay_ms)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.max_retries);

        let result = RetryIf::spawn(
            strategy,
            || self.validate_once(organization_id),
            DirectoryError::is_retryable,
        )
        .await;

        match result {
            Err(e) if e.is_retryable() => {
                tracing::error!(
                    organization_id,
                    attempts = self.max_retries + 1,
                    error = %e,
                    "Organization lookup retries exhausted"
                );
                Err(DirectoryError::RetryExhausted {
                    attempts: self.max_retries + 1,
                })
            }
            other => other,
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
