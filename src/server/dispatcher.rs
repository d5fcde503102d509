//! JSON-RPC method routing: decodes one request, routes it to the Task
//! Manager, Turn Executor, or Capability Registry, and encodes the result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::capability::CapabilityRegistry;
use crate::card::CachedAgentCard;
use crate::error::{AgentError, AgentResult};
use crate::executor::{CancelFlag, TurnExecutor};
use crate::task::{CancelOutcome, TaskManager};
use crate::types::{AgentConfig, JsonRpcRequest, JsonRpcResponse};

/// Everything the dispatcher needs to route a request. Each field is
/// independently synchronized; the dispatcher itself holds no lock.
pub struct Dispatcher {
    pub config: AgentConfig,
    pub tasks: Arc<TaskManager>,
    pub registry: Arc<CapabilityRegistry>,
    pub executor: Arc<TurnExecutor>,
    pub card_cache: Arc<CachedAgentCard>,
    /// Cancel flags for turns currently in flight, keyed by task id. Lets
    /// `tasks/cancel` reach a turn that's mid-execution instead of only
    /// flipping task state after the fact.
    pub in_flight: Arc<RwLock<HashMap<String, CancelFlag>>>,
}

impl Dispatcher {
    pub fn new(
        config: AgentConfig,
        tasks: Arc<TaskManager>,
        registry: Arc<CapabilityRegistry>,
        executor: Arc<TurnExecutor>,
        card_cache: Arc<CachedAgentCard>,
    ) -> Self {
        Self {
            config,
            tasks,
            registry,
            executor,
            card_cache,
            in_flight: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let result = self.route(&request).await;

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::failure(id, err.into()),
        }
    }

    async fn route(&self, request: &JsonRpcRequest) -> AgentResult<serde_json::Value> {
        match request.method.as_str() {
            "message/send" | "send-task" => self.handle_message_send(request).await,
            "tasks/get" => self.handle_tasks_get(request).await,
            "tasks/cancel" => self.handle_tasks_cancel(request).await,
            "tools/add" | "agents/add" => self.handle_capability_add(request).await,
            "tools/remove" | "agents/remove" => self.handle_capability_remove(request).await,
            "tools/list" | "agents/list" => self.handle_capability_list().await,
            "tools/history" | "agents/history" => self.handle_capability_history().await,
            other => Err(AgentError::protocol(format!("unknown method '{other}'"))),
        }
    }

    async fn handle_message_send(&self, request: &JsonRpcRequest) -> AgentResult<serde_json::Value> {
        let (session_id, text) = parse_message_send_params(&request.params)?;

        let task_id = self.tasks.create(&session_id, &text).await;
        self.tasks.start_working(&task_id).await?;

        let deadline = Instant::now() + Duration::from_millis(self.config.turn_deadline_ms);
        let cancel = CancelFlag::new();
        self.in_flight.write().await.insert(task_id.clone(), cancel.clone());

        let outcome = self
            .executor
            .execute_turn(&self.config, &session_id, &text, deadline, &cancel)
            .await;

        self.in_flight.write().await.remove(&task_id);

        let status = match &outcome {
            Ok(reply) => {
                self.tasks.complete(&task_id, reply.clone()).await?;
                "completed"
            }
            Err(AgentError::Cancelled { .. }) => {
                self.tasks.cancel(&task_id).await.ok();
                "cancelled"
            }
            Err(err) => {
                self.tasks.fail(&task_id, err.to_string()).await?;
                "failed"
            }
        };

        match outcome {
            Ok(reply) => Ok(serde_json::json!({
                "taskId": task_id,
                "status": status,
                "result": { "message": { "role": "agent", "content": reply } },
            })),
            Err(err) => Ok(serde_json::json!({
                "taskId": task_id,
                "status": status,
                "error": { "kind": err.to_string() },
            })),
        }
    }

    async fn handle_tasks_get(&self, request: &JsonRpcRequest) -> AgentResult<serde_json::Value> {
        let task_id = request
            .params
            .get("taskId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::reject("tasks/get requires 'taskId'"))?;
        let task = self.tasks.get(task_id).await?;
        serde_json::to_value(task).map_err(AgentError::from)
    }

    async fn handle_tasks_cancel(&self, request: &JsonRpcRequest) -> AgentResult<serde_json::Value> {
        let task_id = request
            .params
            .get("taskId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::reject("tasks/cancel requires 'taskId'"))?;

        if let Some(flag) = self.in_flight.read().await.get(task_id) {
            flag.cancel();
        }

        let outcome = self.tasks.cancel(task_id).await?;
        let status = match outcome {
            CancelOutcome::Cancelled => "cancelled",
            CancelOutcome::AlreadyTerminal => "already_terminal",
        };
        Ok(serde_json::json!({ "taskId": task_id, "status": status }))
    }

    async fn handle_capability_add(&self, request: &JsonRpcRequest) -> AgentResult<serde_json::Value> {
        let url = request
            .params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::reject("add requires 'url'"))?;
        let deadline = Duration::from_millis(self.config.turn_deadline_ms);
        let outcome = self.registry.add(url, deadline).await?;
        Ok(serde_json::json!({
            "url": outcome.url,
            "kind": outcome.kind,
            "functions": outcome.functions,
        }))
    }

    async fn handle_capability_remove(&self, request: &JsonRpcRequest) -> AgentResult<serde_json::Value> {
        let url = request
            .params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::reject("remove requires 'url'"))?;
        let outcome = self.registry.remove(url).await;
        Ok(serde_json::json!({ "url": outcome.url, "removed": outcome.removed }))
    }

    async fn handle_capability_list(&self) -> AgentResult<serde_json::Value> {
        let summaries = self.registry.list().await;
        serde_json::to_value(summaries).map_err(AgentError::from)
    }

    async fn handle_capability_history(&self) -> AgentResult<serde_json::Value> {
        let history = self.registry.history().await;
        serde_json::to_value(history).map_err(AgentError::from)
    }
}

fn parse_message_send_params(params: &serde_json::Value) -> AgentResult<(String, String)> {
    let session_id = params
        .get("sessionId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::reject("message/send requires 'sessionId'"))?
        .to_string();

    // Canonicalize `message.content` vs the legacy `message.parts[].text`
    // to one string before anything reaches session history.
    let message = params
        .get("message")
        .ok_or_else(|| AgentError::reject("message/send requires 'message'"))?;

    if let Some(content) = message.get("content").and_then(|v| v.as_str()) {
        return Ok((session_id, content.to_string()));
    }

    if let Some(parts) = message.get("parts").and_then(|v| v.as_array()) {
        let text = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join("");
        return Ok((session_id, text));
    }

    Err(AgentError::reject(
        "message/send requires 'message.content' or 'message.parts[].text'",
    ))
}
