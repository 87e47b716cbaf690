//! Session and conversation lifecycle through the service layer.

use std::collections::HashSet;
use std::sync::Arc;

use beacon_core::models::NewContactSession;
use beacon_core::{InMemoryAgentThreads, ManualClock, MemoryStore, StaticOrganizationDirectory};
use beacon_server::services::Services;

struct Harness {
    services: Services,
    store: Arc<MemoryStore>,
    threads: Arc<InMemoryAgentThreads>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let threads = Arc::new(InMemoryAgentThreads::new());
    let clock = Arc::new(ManualClock::new(0));
    let services = Services::new(
        store.clone(),
        threads.clone(),
        Arc::new(StaticOrganizationDirectory::new(["org_1", "org_2"])),
        clock.clone(),
        "Hello! How can I help you today?",
    );
    Harness {
        services,
        store,
        threads,
        clock,
    }
}

fn visitor(org: &str) -> NewContactSession {
    NewContactSession {
        name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
        organization_id: org.to_string(),
        metadata: None,
    }
}

#[tokio::test]
async fn test_concurrent_creates_yield_distinct_ids() {
    let h = harness();

    let mut handles = Vec::new();
    for _ in 0..25 {
        let sessions = h.services.contact_sessions.clone();
        handles.push(tokio::spawn(async move {
            sessions.create(visitor("org_1")).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 25);
    assert_eq!(h.store.contact_session_count().await, 25);
}

#[tokio::test]
async fn test_concurrent_conversations_on_one_session() {
    let h = harness();
    let session = h.services.contact_sessions.create(visitor("org_1")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let conversations = h.services.conversations.clone();
        handles.push(tokio::spawn(async move {
            conversations.create("org_1", session).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 10);
    assert_eq!(h.threads.thread_count().await, 10);
    assert_eq!(h.store.conversation_count().await, 10);
}

#[tokio::test]
async fn test_sessions_are_scoped_to_their_organization() {
    let h = harness();
    let in_org_1 = h.services.contact_sessions.create(visitor("org_1")).await.unwrap();
    let in_org_2 = h.services.contact_sessions.create(visitor("org_2")).await.unwrap();

    assert!(h.services.conversations.create("org_1", in_org_1).await.is_ok());
    let err = h
        .services
        .conversations
        .create("org_1", in_org_2)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED");
}

#[tokio::test]
async fn test_expiry_is_judged_at_the_call() {
    let h = harness();
    let id = h.services.contact_sessions.create(visitor("org_1")).await.unwrap();
    let session = h
        .services
        .contact_sessions
        .validate(id)
        .await
        .unwrap()
        .session
        .unwrap();

    h.clock.set(session.expires_at - 1);
    let conversation = h.services.conversations.create("org_1", id).await.unwrap();
    assert!(h.services.conversations.get_one(conversation, id).await.is_ok());

    h.clock.set(session.expires_at);
    assert!(!h.services.contact_sessions.validate(id).await.unwrap().valid);
    let err = h
        .services
        .conversations
        .get_one(conversation, id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED");
    assert_eq!(h.store.conversation_count().await, 1);
}
