//! S1 — send, retrieve, cancel a completed task.

use std::sync::Arc;

use agent_fabric::capability::CapabilityRegistry;
use agent_fabric::card::CachedAgentCard;
use agent_fabric::executor::{AdapterDecision, StubLlmAdapter, TurnExecutor};
use agent_fabric::server::Dispatcher;
use agent_fabric::session::SessionStore;
use agent_fabric::task::TaskManager;
use agent_fabric::types::{AgentConfig, JsonRpcRequest};

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

async fn build_dispatcher(reply: &str) -> Dispatcher {
    let config = test_config();
    let registry = Arc::new(CapabilityRegistry::new(config.agent_id.clone()));
    let sessions = Arc::new(SessionStore::new());
    let tasks = Arc::new(TaskManager::new());
    let adapter = Arc::new(StubLlmAdapter::new(vec![AdapterDecision::FinalText(reply.to_string())]));
    let executor = Arc::new(TurnExecutor::new(sessions, registry.clone(), adapter));
    let card_cache = Arc::new(CachedAgentCard::new(&config, &registry).await);

    Dispatcher::new(config, tasks, registry, executor, card_cache)
}

#[tokio::test]
async fn send_retrieve_cancel_completed_task() {
    let dispatcher = build_dispatcher("pong").await;

    let send_request = JsonRpcRequest::new(
        "1",
        "message/send",
        serde_json::json!({ "message": { "content": "ping" }, "sessionId": "s1" }),
    );
    let response = dispatcher.handle(send_request).await;
    let result = response.result.expect("message/send should succeed");
    assert_eq!(result["status"], "completed");
    let content = result["result"]["message"]["content"].as_str().unwrap();
    assert!(!content.is_empty());
    let task_id = result["taskId"].as_str().unwrap().to_string();

    let get_request = JsonRpcRequest::new("2", "tasks/get", serde_json::json!({ "taskId": task_id }));
    let get_response = dispatcher.handle(get_request).await;
    let task = get_response.result.expect("tasks/get should succeed");
    assert_eq!(task["status"], "completed");

    let cancel_request = JsonRpcRequest::new("3", "tasks/cancel", serde_json::json!({ "taskId": task_id }));
    let cancel_response = dispatcher.handle(cancel_request).await;
    let cancel_result = cancel_response.result.expect("tasks/cancel should succeed");
    assert_eq!(cancel_result["taskId"], task_id);
    assert_eq!(cancel_result["status"], "already_terminal");
}

#[tokio::test]
async fn tasks_get_on_unknown_task_is_not_found() {
    let dispatcher = build_dispatcher("pong").await;
    let request = JsonRpcRequest::new("1", "tasks/get", serde_json::json!({ "taskId": "nope" }));
    let response = dispatcher.handle(request).await;
    let error = response.error.expect("unknown task should error");
    assert_eq!(error.code, -32001);
}
