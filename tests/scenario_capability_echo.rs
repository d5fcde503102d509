//! S2 — add a tool, call it in a turn, remove it, confirm card updates.
//! S3 — session continuity across a capability change.

mod common;

use std::sync::Arc;
use std::time::Duration;

use agent_fabric::capability::CapabilityRegistry;
use agent_fabric::card::build_agent_card;
use agent_fabric::executor::{AdapterDecision, StubLlmAdapter, TurnExecutor};
use agent_fabric::session::SessionStore;
use agent_fabric::types::{AgentConfig, Role};

use common::FakeServer;

fn test_config() -> AgentConfig {
    AgentConfig {
        agent_id: "agent-1".to_string(),
        display_name: "Test Agent".to_string(),
        version: "1.0.0".to_string(),
        greeting: "hi".to_string(),
        instructions: String::new(),
        personality: String::new(),
        llm_model: "stub".to_string(),
        base_system_prompt: "You are a test agent.".to_string(),
        initial_capability_urls: vec![],
        port: 0,
        max_tool_calls_per_turn: 16,
        turn_deadline_ms: 5_000,
    }
}

#[tokio::test]
async fn add_call_remove_updates_card_and_history() {
    let fake = FakeServer::start(false, false).await;
    let config = test_config();
    let registry = Arc::new(CapabilityRegistry::new(config.agent_id.clone()));

    let add_outcome = registry.add(&fake.base_url, Duration::from_secs(5)).await.unwrap();
    assert!(!add_outcome.already_present);
    assert_eq!(add_outcome.functions, vec!["echo".to_string()]);

    let card_before_call = build_agent_card(&config, &registry).await;
    assert!(card_before_call.skills.iter().any(|s| s.name == "echo"));

    let sessions = Arc::new(SessionStore::new());
    let adapter = Arc::new(StubLlmAdapter::new(vec![
        AdapterDecision::CallFunction {
            capability_key: "echo".to_string(),
            arguments: serde_json::json!({ "text": "hello" }),
        },
        AdapterDecision::FinalText("you said hello".to_string()),
    ]));
    let executor = TurnExecutor::new(sessions.clone(), registry.clone(), adapter);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let cancel = agent_fabric::executor::CancelFlag::new();
    let reply = executor
        .execute_turn(&config, "s2", "please echo hello", deadline, &cancel)
        .await
        .unwrap();
    assert!(reply.contains("hello"));

    let history = sessions.snapshot("s2").await;
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::CapabilityCall);
    assert_eq!(history[2].role, Role::CapabilityResult);
    assert_eq!(history[3].role, Role::Assistant);

    let remove_outcome = registry.remove(&fake.base_url).await;
    assert!(remove_outcome.removed);

    let card_after_remove = build_agent_card(&config, &registry).await;
    assert!(!card_after_remove.skills.iter().any(|s| s.name == "echo"));

    let audit = registry.history().await;
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].url, fake.base_url);
    assert!(audit[0].session_preserved);
    assert!(audit[1].session_preserved);
}

#[tokio::test]
async fn session_continuity_across_capability_change() {
    let config = test_config();
    let registry = Arc::new(CapabilityRegistry::new(config.agent_id.clone()));
    let sessions = Arc::new(SessionStore::new());

    let adapter = Arc::new(StubLlmAdapter::new(vec![AdapterDecision::FinalText(
        "got it, I'll remember 42".to_string(),
    )]));
    let executor = TurnExecutor::new(sessions.clone(), registry.clone(), adapter);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let cancel = agent_fabric::executor::CancelFlag::new();
    executor
        .execute_turn(&config, "s3", "remember 42", deadline, &cancel)
        .await
        .unwrap();

    let fake = FakeServer::start(false, false).await;
    registry.add(&fake.base_url, Duration::from_secs(5)).await.unwrap();

    let adapter2 = Arc::new(StubLlmAdapter::new(vec![
        AdapterDecision::CallFunction {
            capability_key: "echo".to_string(),
            arguments: serde_json::json!({ "text": "84" }),
        },
        AdapterDecision::FinalText("84".to_string()),
    ]));
    let executor2 = TurnExecutor::new(sessions.clone(), registry.clone(), adapter2);
    let reply = executor2
        .execute_turn(&config, "s3", "double what I told you", deadline, &cancel)
        .await
        .unwrap();
    assert_eq!(reply, "84");

    let history = sessions.snapshot("s3").await;
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "remember 42");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "got it, I'll remember 42");
}
