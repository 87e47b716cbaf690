//! The widget's view of the backend: the five public calls.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::error::CODE_INTERNAL;
use beacon_core::models::{ConversationView, NewContactSession, SessionValidation};
use beacon_core::OrganizationCheck;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Result, WidgetError};

#[async_trait]
pub trait WidgetBackend: Send + Sync {
    async fn validate_organization(&self, organization_id: &str) -> Result<OrganizationCheck>;

    async fn create_contact_session(&self, input: NewContactSession) -> Result<Uuid>;

    async fn validate_contact_session(&self, contact_session_id: Uuid) -> Result<SessionValidation>;

    async fn create_conversation(
        &self,
        organization_id: &str,
        contact_session_id: Uuid,
    ) -> Result<Uuid>;

    async fn get_conversation(
        &self,
        conversation_id: Uuid,
        contact_session_id: Uuid,
    ) -> Result<ConversationView>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactSessionCreated {
    contact_session_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationCreated {
    conversation_id: Uuid,
}

/// Talks to the beacon-server HTTP API.
#[derive(Debug, Clone)]
pub struct HttpWidgetBackend {
    client: Client,
    base_url: String,
}

impl HttpWidgetBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(&body).send().await?;
        decode(response).await
    }
}

/// Success bodies decode as `T`; failures become `Remote` with the server's code.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (
            body.code.unwrap_or_else(|| CODE_INTERNAL.to_string()),
            body.error.unwrap_or(text),
        ),
        Err(_) => (CODE_INTERNAL.to_string(), text),
    };
    tracing::warn!(status = status.as_u16(), %code, %message, "Backend call failed");
    Err(WidgetError::Remote { code, message })
}

#[async_trait]
impl WidgetBackend for HttpWidgetBackend {
    async fn validate_organization(&self, organization_id: &str) -> Result<OrganizationCheck> {
        self.post(
            "/organizations/validate",
            serde_json::json!({ "organizationId": organization_id }),
        )
        .await
    }

    async fn create_contact_session(&self, input: NewContactSession) -> Result<Uuid> {
        let created: ContactSessionCreated = self
            .post("/contact-sessions", serde_json::to_value(&input)?)
            .await?;
        Ok(created.contact_session_id)
    }

    async fn validate_contact_session(
        &self,
        contact_session_id: Uuid,
    ) -> Result<SessionValidation> {
        self.post(
            "/contact-sessions/validate",
            serde_json::json!({ "contactSessionId": contact_session_id }),
        )
        .await
    }

    async fn create_conversation(
        &self,
        organization_id: &str,
        contact_session_id: Uuid,
    ) -> Result<Uuid> {
        let created: ConversationCreated = self
            .post(
                "/conversations",
                serde_json::json!({
                    "organizationId": organization_id,
                    "contactSessionId": contact_session_id,
                }),
            )
            .await?;
        Ok(created.conversation_id)
    }

    async fn get_conversation(
        &self,
        conversation_id: Uuid,
        contact_session_id: Uuid,
    ) -> Result<ConversationView> {
        let url = format!("{}/conversations/{}", self.base_url, conversation_id);
        let response = self
            .client
            .get(&url)
            .query(&[("contactSessionId", contact_session_id.to_string())])
            .send()
            .await?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::models::ConversationStatus;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_validate_organization_soft_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations/validate"))
            .and(body_json(serde_json::json!({ "organizationId": "org_9" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "valid": false,
                "reason": "Organization not found"
            })))
            .mount(&server)
            .await;

        let backend = HttpWidgetBackend::new(&server.uri()).unwrap();
        let check = backend.validate_organization("org_9").await.unwrap();
        assert!(!check.valid);
        assert_eq!(check.reason.as_deref(), Some("Organization not found"));
    }

    #[tokio::test]
    async fn test_create_contact_session_sends_camel_case() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/contact-sessions"))
            .and(body_json(serde_json::json!({
                "name": "Ada",
                "email": "ada@example.com",
                "organizationId": "org_1",
                "metadata": null
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "contactSessionId": id })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpWidgetBackend::new(&server.uri()).unwrap();
        let created = backend
            .create_contact_session(NewContactSession {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                organization_id: "org_1".to_string(),
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(created, id);
    }

    #[tokio::test]
    async fn test_coded_failure_becomes_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "Invalid session",
                "code": "UNAUTHORIZED",
                "status": "error"
            })))
            .mount(&server)
            .await;

        let backend = HttpWidgetBackend::new(&server.uri()).unwrap();
        let err = backend
            .create_conversation("org_1", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Invalid session");
    }

    #[tokio::test]
    async fn test_uncoded_failure_is_internal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contact-sessions/validate"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let backend = HttpWidgetBackend::new(&server.uri()).unwrap();
        let err = backend
            .validate_contact_session(Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("INTERNAL"));
        assert_eq!(err.to_string(), "bad gateway");
    }

    #[tokio::test]
    async fn test_get_conversation_passes_session_in_query() {
        let server = MockServer::start().await;
        let conversation = Uuid::new_v4();
        let session = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path(format!("/conversations/{}", conversation)))
            .and(query_param("contactSessionId", session.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": conversation,
                "status": "unresolved",
                "threadId": "thread_abc"
            })))
            .mount(&server)
            .await;

        let backend = HttpWidgetBackend::new(&format!("{}/", server.uri())).unwrap();
        let view = backend.get_conversation(conversation, session).await.unwrap();
        assert_eq!(view.id, conversation);
        assert_eq!(view.status, ConversationStatus::Unresolved);
        assert_eq!(view.thread_id, "thread_abc");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let backend = HttpWidgetBackend::new("http://127.0.0.1:1").unwrap();
        let err = backend.validate_organization("org_1").await.unwrap_err();
        assert!(matches!(err, WidgetError::Transport(_)));
    }
}
