//! Quantified invariants 2 and 3, and the two round-trip/idempotence laws
//! from `SPEC_FULL.md` §8.

mod common;

use std::sync::Arc;
use std::time::Duration;

use agent_fabric::capability::CapabilityRegistry;

use common::FakeServer;

#[tokio::test]
async fn add_then_remove_leaves_list_empty_but_history_has_both_entries() {
    let fake = FakeServer::start(false, false).await;
    let registry = CapabilityRegistry::new("self");
    let deadline = Duration::from_secs(5);

    registry.add(&fake.base_url, deadline).await.unwrap();
    registry.remove(&fake.base_url).await;

    let list = registry.list().await;
    assert!(!list.iter().any(|s| s.url == fake.base_url));

    let history = registry.history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].url, fake.base_url);
    assert_eq!(history[1].url, fake.base_url);
}

#[tokio::test]
async fn concurrent_adds_of_same_url_are_idempotent() {
    let fake = FakeServer::start(false, false).await;
    let registry = Arc::new(CapabilityRegistry::new("self"));
    let deadline = Duration::from_secs(5);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let url = fake.base_url.clone();
        handles.push(tokio::spawn(async move { registry.add(&url, deadline).await }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let list = registry.list().await;
    assert_eq!(list.iter().filter(|s| s.url == fake.base_url).count(), 1);

    let history = registry.history().await;
    assert_eq!(history.len(), 8, "every add attempt, including no-ops, is audited");
}

#[tokio::test]
async fn add_applied_twice_equals_add_once_in_list() {
    let fake = FakeServer::start(false, false).await;
    let registry = CapabilityRegistry::new("self");
    let deadline = Duration::from_secs(5);

    let first = registry.add(&fake.base_url, deadline).await.unwrap();
    let second = registry.add(&fake.base_url, deadline).await.unwrap();

    assert!(!first.already_present);
    assert!(second.already_present);
    assert_eq!(registry.list().await.len(), 1);

    let history = registry.history().await;
    assert_eq!(history.len(), 2, "the no-op second add still leaves an audit entry");
}

#[tokio::test]
async fn unreachable_url_returns_error_without_registering() {
    let registry = CapabilityRegistry::new("self");
    let err = registry
        .add("http://127.0.0.1:1/nope", Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, agent_fabric::error::AgentError::TransportError { .. }));
    assert!(registry.list().await.is_empty());
}
