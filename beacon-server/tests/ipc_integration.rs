//! Unix socket IPC round trips: length-prefixed MessagePack frames.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::ipc::{WidgetRequest, WidgetResponse};
use beacon_core::{InMemoryAgentThreads, ManualClock, MemoryStore, StaticOrganizationDirectory};
use beacon_server::server::run_unix_server;
use beacon_server::services::Services;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::sync::broadcast;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

fn services() -> Services {
    Services::new(
        Arc::new(MemoryStore::new()),
        Arc::new(InMemoryAgentThreads::new()),
        Arc::new(StaticOrganizationDirectory::new(["org_1"])),
        Arc::new(ManualClock::new(0)),
        "Hello! How can I help you today?",
    )
}

async fn connect(path: &std::path::Path) -> Framed<UnixStream, LengthDelimitedCodec> {
    for _ in 0..50 {
        if let Ok(stream) = UnixStream::connect(path).await {
            let codec = LengthDelimitedCodec::builder().little_endian().new_codec();
            return Framed::new(stream, codec);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("IPC server never came up at {}", path.display());
}

async fn call(
    framed: &mut Framed<UnixStream, LengthDelimitedCodec>,
    request: &WidgetRequest,
) -> WidgetResponse {
    let bytes = rmp_serde::to_vec_named(request).unwrap();
    framed.send(Bytes::from(bytes)).await.unwrap();
    let frame = framed.next().await.unwrap().unwrap();
    rmp_serde::from_slice(&frame).unwrap()
}

#[tokio::test]
async fn test_ipc_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("beacon.sock");
    let socket_str = socket.to_string_lossy().to_string();

    let (tx, _rx) = broadcast::channel(1);
    let server = tokio::spawn({
        let shutdown = tx.subscribe();
        async move { run_unix_server(&socket_str, services(), shutdown).await }
    });

    let mut framed = connect(&socket).await;

    let pong = call(&mut framed, &WidgetRequest::Ping).await;
    assert!(pong.is_ok());

    let created = call(
        &mut framed,
        &WidgetRequest::CreateContactSession {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            organization_id: "org_1".to_string(),
            metadata: None,
        },
    )
    .await;
    assert!(created.is_ok(), "{:?}", created.error);
    let id: uuid::Uuid =
        serde_json::from_value(created.data.unwrap()["contactSessionId"].clone()).unwrap();

    let validated = call(
        &mut framed,
        &WidgetRequest::ValidateContactSession {
            contact_session_id: id,
        },
    )
    .await;
    assert_eq!(validated.data.unwrap()["valid"], true);

    let rejected = call(
        &mut framed,
        &WidgetRequest::GetConversation {
            conversation_id: uuid::Uuid::new_v4(),
            contact_session_id: uuid::Uuid::new_v4(),
        },
    )
    .await;
    assert_eq!(rejected.code.as_deref(), Some("UNAUTHORIZED"));

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    assert!(!socket.exists());
}

#[tokio::test]
async fn test_ipc_garbage_frame_gets_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("beacon.sock");
    let socket_str = socket.to_string_lossy().to_string();

    let (tx, _rx) = broadcast::channel(1);
    let server = tokio::spawn({
        let shutdown = tx.subscribe();
        async move { run_unix_server(&socket_str, services(), shutdown).await }
    });

    let mut framed = connect(&socket).await;
    framed.send(Bytes::from_static(b"\xc1not msgpack")).await.unwrap();
    let frame = framed.next().await.unwrap().unwrap();
    let response: WidgetResponse = rmp_serde::from_slice(&frame).unwrap();
    assert!(!response.is_ok());
    assert_eq!(response.code.as_deref(), Some("BAD_REQUEST"));

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
