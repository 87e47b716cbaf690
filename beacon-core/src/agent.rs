//! Agent thread client — the external AI agent service that owns message history.
//!
//! Provides an `AgentThreads` trait with implementations for:
//! - **Http** — the hosted agent service (`POST /threads`, `POST /threads/{id}/messages`)
//! - **InMemory** — process-local threads for development and tests

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::AgentConfig;

/// Seed message posted into every new conversation thread.
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

// ============================================================================
// AgentThreads trait
// ============================================================================

#[async_trait]
pub trait AgentThreads: Send + Sync {
    /// Open a new thread owned by `user_id` (the organization) and return its id.
    async fn create_thread(&self, user_id: &str) -> Result<String, AgentError>;

    /// Append a message to an existing thread.
    async fn save_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), AgentError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Unknown thread: {0}")]
    UnknownThread(String),

    #[error("Invalid agent base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

impl AgentError {
    /// Transport failures, rate limits and server errors are worth retrying.
    fn is_retryable(&self) -> bool {
        match self {
            AgentError::Http(_) => true,
            AgentError::Api { code, .. } => {
                *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || *code >= 500
            }
            _ => false,
        }
    }

    /// The request never took effect, so a non-idempotent call may be resent.
    /// A timeout or 5xx can arrive after the service already applied it.
    fn is_unsent(&self) -> bool {
        match self {
            AgentError::Http(e) => e.is_connect(),
            AgentError::Api { code, .. } => *code == StatusCode::TOO_MANY_REQUESTS.as_u16(),
            _ => false,
        }
    }
}

// ============================================================================
// HttpAgentThreads
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateThreadRequest<'a> {
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateThreadResponse {
    thread_id: String,
}

#[derive(Debug, Serialize)]
struct SaveMessageRequest<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpAgentThreads {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    max_retries: usize,
    retry_delay_ms: u64,
}

impl HttpAgentThreads {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AgentError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AgentError::InvalidBaseUrl(config.base_url.clone()));
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    async fn with_retry<T, F, Fut>(
        &self,
        op: &str,
        retry_if: fn(&AgentError) -> bool,
        action: F,
    ) -> Result<T, AgentError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AgentError>>,
    {
        let strategy = ExponentialBackoff::from_millis(self.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries);

        match RetryIf::spawn(strategy, action, retry_if).await {
            Ok(value) => Ok(value),
            Err(e) if retry_if(&e) => {
                tracing::error!(
                    op,
                    attempts = self.max_retries + 1,
                    error = %e,
                    "All agent retry attempts failed"
                );
                Err(AgentError::RetryExhausted {
                    attempts: self.max_retries + 1,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Base URL plus `segments`, each percent-encoded as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn create_thread_once(&self, user_id: &str) -> Result<String, AgentError> {
        let url = self.endpoint(&["threads"]);
        let response = self
            .request(url)
            .json(&CreateThreadRequest { user_id })
            .send()
            .await?;
        let response = error_for_status(response).await?;
        let body: CreateThreadResponse = response.json().await?;
        Ok(body.thread_id)
    }

    async fn save_message_once(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), AgentError> {
        let url = self.endpoint(&["threads", thread_id, "messages"]);
        let response = self
            .request(url)
            .json(&SaveMessageRequest { role, content })
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AgentError::UnknownThread(thread_id.to_string()));
        }
        error_for_status(response).await?;
        Ok(())
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    tracing::warn!(code = status.as_u16(), message = %message, "Agent API error");
    Err(AgentError::Api {
        code: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AgentThreads for HttpAgentThreads {
    async fn create_thread(&self, user_id: &str) -> Result<String, AgentError> {
        self.with_retry("create_thread", AgentError::is_retryable, || {
            self.create_thread_once(user_id)
        })
        .await
    }

    async fn save_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), AgentError> {
        // Messages are not idempotent; only resend what never landed.
        self.with_retry("save_message", AgentError::is_unsent, || {
            self.save_message_once(thread_id, role, content)
        })
        .await
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// InMemoryAgentThreads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredThread {
    pub user_id: String,
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Default)]
pub struct InMemoryAgentThreads {
    threads: Mutex<HashMap<String, StoredThread>>,
}

impl InMemoryAgentThreads {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn thread(&self, thread_id: &str) -> Option<StoredThread> {
        self.threads.lock().await.get(thread_id).cloned()
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.lock().await.len()
    }
}

#[async_trait]
impl AgentThreads for InMemoryAgentThreads {
    async fn create_thread(&self, user_id: &str) -> Result<String, AgentError> {
        let thread_id = format!("thread_{}", uuid::Uuid::new_v4().simple());
        self.threads.lock().await.insert(
            thread_id.clone(),
            StoredThread {
                user_id: user_id.to_string(),
                messages: Vec::new(),
            },
        );
        Ok(thread_id)
    }

    async fn save_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), AgentError> {
        let mut threads = self.threads.lock().await;
        let thread = threads
            .get_mut(thread_id)
            .ok_or_else(|| AgentError::UnknownThread(thread_id.to_string()))?;
        thread.messages.push(StoredMessage {
            role,
            content: content.to_string(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> AgentConfig {
        AgentConfig {
            base_url,
            api_key: Some("agent-key".to_string()),
            max_retries: 2,
            retry_delay_ms: 10,
            ..AgentConfig::default()
        }
    }

    #[tokio::test]
    async fn test_create_thread_posts_user_id() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/threads"))
            .and(header("authorization", "Bearer agent-key"))
            .and(body_json(serde_json::json!({ "userId": "org_1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "threadId": "thread_abc" })),
            )
            .mount(&mock_server)
            .await;

        let thread_id = client.create_thread("org_1").await.unwrap();
        assert_eq!(thread_id, "thread_abc");
    }

    #[tokio::test]
    async fn test_save_message_posts_role_and_content() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/threads/thread_abc/messages"))
            .and(body_json(serde_json::json!({
                "role": "assistant",
                "content": DEFAULT_GREETING
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        client
            .save_message("thread_abc", MessageRole::Assistant, DEFAULT_GREETING)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_retries_on_503_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "threadId": "thread_retry" })),
            )
            .mount(&mock_server)
            .await;

        let thread_id = client.create_thread("org_1").await.unwrap();
        assert_eq!(thread_id, "thread_retry");
    }

    #[tokio::test]
    async fn test_persistent_500_exhausts_retries() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        match client.create_thread("org_1").await {
            Err(AgentError::RetryExhausted { attempts }) => assert_eq!(attempts, 3),
            other => panic!("Expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad user"))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.create_thread("org_1").await {
            Err(AgentError::Api { code, message }) => {
                assert_eq!(code, 400);
                assert_eq!(message, "bad user");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_message_server_error_is_not_resent() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/threads/thread_abc/messages"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client
            .save_message("thread_abc", MessageRole::Assistant, DEFAULT_GREETING)
            .await
        {
            Err(AgentError::Api { code, .. }) => assert_eq!(code, 502),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_message_timeout_is_not_resent() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&AgentConfig {
            timeout_ms: 100,
            ..test_config(mock_server.uri())
        })
        .unwrap();

        Mock::given(method("POST"))
            .and(path("/threads/thread_slow/messages"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(500)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client
            .save_message("thread_slow", MessageRole::Assistant, DEFAULT_GREETING)
            .await;
        assert!(matches!(result, Err(AgentError::Http(ref e)) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_save_message_retries_rate_limit() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        client
            .save_message("thread_abc", MessageRole::Assistant, DEFAULT_GREETING)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_thread_id_is_one_path_segment() {
        let mock_server = MockServer::start().await;
        let client = HttpAgentThreads::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/threads/a%2F..%2Fb%3Fx/messages"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        client
            .save_message("a/../b?x", MessageRole::User, "hi")
            .await
            .unwrap();
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpAgentThreads::new(&test_config("not a url".to_string()));
        assert!(matches!(result, Err(AgentError::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn test_in_memory_threads_record_messages() {
        let threads = InMemoryAgentThreads::new();
        let thread_id = threads.create_thread("org_1").await.unwrap();
        threads
            .save_message(&thread_id, MessageRole::Assistant, DEFAULT_GREETING)
            .await
            .unwrap();

        let thread = threads.thread(&thread_id).await.unwrap();
        assert_eq!(thread.user_id, "org_1");
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].content, DEFAULT_GREETING);
        assert_eq!(threads.name(), "memory");
    }

    #[tokio::test]
    async fn test_in_memory_unknown_thread() {
        let threads = InMemoryAgentThreads::new();
        let result = threads
            .save_message("nope", MessageRole::User, "hi")
            .await;
        assert!(matches!(result, Err(AgentError::UnknownThread(_))));
    }
}
