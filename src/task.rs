//! Task manager: owns the lifecycle of each inbound work unit.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, AgentResult};
use crate::types::{Task, TaskState};

/// Result of a `cancel` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyTerminal,
}

/// Owns every `Task` created by the dispatcher. `create`/`transition` are
/// linearizable per task id (both hold the same single write lock; tasks
/// are independent of each other only in the sense that one task's
/// transition never blocks on another's in-flight turn).
pub struct TaskManager {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, session_id: &str, inbound_message: &str) -> String {
        let task_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let task = Task {
            task_id: task_id.clone(),
            session_id: session_id.to_string(),
            status: TaskState::Submitted,
            created_at: now,
            updated_at: now,
            inbound_message: inbound_message.to_string(),
            outbound_reply: None,
            error_kind: None,
        };
        self.tasks.write().await.insert(task_id.clone(), task);
        task_id
    }

    /// Move `task_id` to `working`. Only legal from `submitted`.
    pub async fn start_working(&self, task_id: &str) -> AgentResult<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| AgentError::not_found(format!("unknown task {task_id}")))?;
        if task.status != TaskState::Submitted {
            return Err(AgentError::protocol(format!(
                "illegal transition from {} to working for task {task_id}",
                task.status
            )));
        }
        task.status = TaskState::Working;
        task.updated_at = Utc::now();
        Ok(())
    }

    /// Move `task_id` to `completed`, recording the reply text. Only legal
    /// from `working`.
    pub async fn complete(&self, task_id: &str, reply: String) -> AgentResult<()> {
        self.finish(task_id, TaskState::Completed, Some(reply), None).await
    }

    /// Move `task_id` to `failed`, recording the error kind. Only legal
    /// from `working`.
    pub async fn fail(&self, task_id: &str, error_kind: String) -> AgentResult<()> {
        self.finish(task_id, TaskState::Failed, None, Some(error_kind)).await
    }

    async fn finish(
        &self,
        task_id: &str,
        new_status: TaskState,
        reply: Option<String>,
        error_kind: Option<String>,
    ) -> AgentResult<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| AgentError::not_found(format!("unknown task {task_id}")))?;
        if task.status != TaskState::Working {
            return Err(AgentError::protocol(format!(
                "illegal transition from {} to {new_status} for task {task_id}",
                task.status
            )));
        }
        task.status = new_status;
        task.outbound_reply = reply;
        task.error_kind = error_kind;
        task.updated_at = Utc::now();
        Ok(())
    }

    pub async fn get(&self, task_id: &str) -> AgentResult<Task> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| AgentError::not_found(format!("unknown task {task_id}")))
    }

    /// `submitted` or `working` → `cancelled`. Idempotent: cancelling an
    /// already-terminal task is a no-op that reports `AlreadyTerminal`.
    pub async fn cancel(&self, task_id: &str) -> AgentResult<CancelOutcome> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| AgentError::not_found(format!("unknown task {task_id}")))?;

        if task.status.is_terminal() {
            return Ok(CancelOutcome::AlreadyTerminal);
        }

        task.status = TaskState::Cancelled;
        task.updated_at = Utc::now();
        Ok(CancelOutcome::Cancelled)
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
