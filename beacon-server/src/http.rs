//! Beacon HTTP API
//!
//! Axum server exposing the widget backend calls over HTTP. Runs alongside the
//! Unix socket IPC server on port 8780 (configurable).
//!
//! Each endpoint is a thin axum handler over an inner function that returns
//! `(StatusCode, body)`, so the inner functions are testable without routing.
//!
//! Endpoints:
//! - GET  /health                      store / database status
//! - GET  /version                     server version info
//! - POST /organizations/validate      soft organization check
//! - POST /contact-sessions            create a contact session
//! - POST /contact-sessions/validate   soft session check
//! - POST /conversations               open a conversation
//! - GET  /conversations/:id           read one (`?contactSessionId=`)

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use beacon_core::error::{CODE_BAD_REQUEST, CODE_NOT_FOUND, CODE_UNAUTHORIZED};
use beacon_core::ipc::{WidgetRequest, WidgetResponse};
use beacon_core::models::SessionMetadata;
use beacon_core::BeaconConfig;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::router::handle_request;
use crate::services::Services;

#[derive(Clone)]
pub struct HttpState {
    pub services: Services,
    pub socket_path: String,
}

pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/organizations/validate", post(validate_organization_handler))
        .route("/contact-sessions", post(create_contact_session_handler))
        .route("/contact-sessions/validate", post(validate_contact_session_handler))
        .route("/conversations", post(create_conversation_handler))
        .route("/conversations/:id", get(get_conversation_handler))
        .with_state(state)
}

/// Serve until the broadcast shutdown signal fires.
pub async fn start_http_server(
    services: Services,
    config: BeaconConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState {
        services,
        socket_path: config.service.socket_path.clone(),
    });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Beacon HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOrganizationBody {
    pub organization_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactSessionBody {
    pub name: String,
    pub email: String,
    pub organization_id: String,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateContactSessionBody {
    pub contact_session_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationBody {
    pub organization_id: String,
    pub contact_session_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub contact_session_id: Uuid,
}

// ============================================================================
// Inner functions
// ============================================================================

pub async fn health_inner(
    services: &Services,
    socket_path: &str,
) -> (StatusCode, serde_json::Value) {
    let response = handle_request(WidgetRequest::Health, services).await;
    match response_to_http(response) {
        Ok(mut data) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert("version".to_string(), serde_json::json!(env!("CARGO_PKG_VERSION")));
                obj.insert("socket".to_string(), serde_json::json!(socket_path));
            }
            (StatusCode::OK, data)
        }
        Err((_, body)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": body["error"],
            }),
        ),
    }
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "beacon/1",
    })
}

/// Run one widget call and map its outcome to an HTTP status.
pub async fn call_inner(
    services: &Services,
    request: WidgetRequest,
) -> (StatusCode, serde_json::Value) {
    match response_to_http(handle_request(request, services).await) {
        Ok(data) => (StatusCode::OK, data),
        Err(failure) => failure,
    }
}

// ============================================================================
// Axum handlers
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.services, &state.socket_path).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn validate_organization_handler(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<ValidateOrganizationBody>,
) -> impl IntoResponse {
    let request = WidgetRequest::ValidateOrganization {
        organization_id: body.organization_id,
    };
    let (status, body) = call_inner(&state.services, request).await;
    (status, Json(body))
}

pub async fn create_contact_session_handler(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<CreateContactSessionBody>,
) -> impl IntoResponse {
    let request = WidgetRequest::CreateContactSession {
        name: body.name,
        email: body.email,
        organization_id: body.organization_id,
        metadata: body.metadata,
    };
    let (status, body) = call_inner(&state.services, request).await;
    (status, Json(body))
}

pub async fn validate_contact_session_handler(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<ValidateContactSessionBody>,
) -> impl IntoResponse {
    let request = WidgetRequest::ValidateContactSession {
        contact_session_id: body.contact_session_id,
    };
    let (status, body) = call_inner(&state.services, request).await;
    (status, Json(body))
}

pub async fn create_conversation_handler(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<CreateConversationBody>,
) -> impl IntoResponse {
    let request = WidgetRequest::CreateConversation {
        organization_id: body.organization_id,
        contact_session_id: body.contact_session_id,
    };
    let (status, body) = call_inner(&state.services, request).await;
    (status, Json(body))
}

pub async fn get_conversation_handler(
    State(state): State<Arc<HttpState>>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<ConversationQuery>,
) -> impl IntoResponse {
    let request = WidgetRequest::GetConversation {
        conversation_id,
        contact_session_id: query.contact_session_id,
    };
    let (status, body) = call_inner(&state.services, request).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        CODE_UNAUTHORIZED => StatusCode::UNAUTHORIZED,
        CODE_NOT_FOUND => StatusCode::NOT_FOUND,
        CODE_BAD_REQUEST => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Split a `WidgetResponse` into its data, or an HTTP status plus error body.
pub fn response_to_http(
    response: WidgetResponse,
) -> std::result::Result<serde_json::Value, (StatusCode, serde_json::Value)> {
    if response.is_ok() {
        return Ok(response.data.unwrap_or(serde_json::json!({})));
    }
    let code = response.code.unwrap_or_else(|| "INTERNAL".to_string());
    Err((
        status_for_code(&code),
        serde_json::json!({
            "error": response.error.unwrap_or_else(|| "unknown error".to_string()),
            "code": code,
            "status": "error",
        }),
    ))
}
