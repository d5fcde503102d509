//! Turn executor: produces one assistual reply for one inbound user
//! message, orchestrating the session store, capability registry, and the
//! out-of-scope LLM provider behind the [`LlmAdapter`] contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::capability::CapabilityRegistry;
use crate::error::{AgentError, AgentResult};
use crate::session::SessionStore;
use crate::types::{AgentConfig, ChatTurn};

/// What the LLM Adapter decided to do with the context it was handed.
#[derive(Debug, Clone)]
pub enum AdapterDecision {
    FinalText(String),
    CallFunction {
        capability_key: String,
        arguments: serde_json::Value,
    },
}

/// The contract the Turn Executor requires from an out-of-scope LLM
/// provider integration. No hidden state: the executor re-supplies the
/// full context on every iteration, so a conforming adapter is pure with
/// respect to its inputs.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn decide(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        available_functions: &[(String, String)],
        deadline: Instant,
    ) -> AgentResult<AdapterDecision>;
}

/// Cooperative cancellation signal for one in-flight turn. Checked at every
/// suspension point (loop iteration boundary); observing it mid-turn ends
/// the turn with `Cancelled` and preserves history up to the last completed
/// entry.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct TurnExecutor {
    sessions: Arc<SessionStore>,
    registry: Arc<CapabilityRegistry>,
    adapter: Arc<dyn LlmAdapter>,
}

impl TurnExecutor {
    pub fn new(sessions: Arc<SessionStore>, registry: Arc<CapabilityRegistry>, adapter: Arc<dyn LlmAdapter>) -> Self {
        Self {
            sessions,
            registry,
            adapter,
        }
    }

    /// Run one turn to completion (or fatal failure). `deadline` bounds the
    /// whole turn; each capability invocation gets whatever remains of it.
    pub async fn execute_turn(
        &self,
        config: &AgentConfig,
        session_id: &str,
        user_text: &str,
        deadline: Instant,
        cancel: &CancelFlag,
    ) -> AgentResult<String> {
        let _turn_lock = self.sessions.lock_turn(session_id).await;

        self.sessions.append(session_id, ChatTurn::user(user_text)).await;

        let mut calls_made = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::cancelled("cancellation observed before turn completed"));
            }
            if Instant::now() >= deadline {
                return Err(AgentError::timeout("turn deadline elapsed"));
            }

            let history = self.sessions.snapshot(session_id).await;
            let functions = self.registry.function_signatures().await;
            let system_prompt = build_system_prompt(config, &functions);

            let decision = self
                .adapter
                .decide(&system_prompt, &history, &functions, deadline)
                .await
                .map_err(|e| match e {
                    AgentError::LLMError { .. } => e,
                    other => AgentError::llm(other.to_string()),
                })?;

            match decision {
                AdapterDecision::FinalText(text) => {
                    self.sessions.append(session_id, ChatTurn::assistant(&text)).await;
                    return Ok(text);
                }
                AdapterDecision::CallFunction {
                    capability_key,
                    arguments,
                } => {
                    if calls_made >= config.max_tool_calls_per_turn {
                        return Err(AgentError::capacity_exceeded(format!(
                            "exceeded max_tool_calls_per_turn ({})",
                            config.max_tool_calls_per_turn
                        )));
                    }
                    calls_made += 1;

                    self.sessions
                        .append(session_id, ChatTurn::capability_call(&capability_key, arguments.clone()))
                        .await;

                    if cancel.is_cancelled() {
                        return Err(AgentError::cancelled("cancellation observed before capability call"));
                    }

                    let call_deadline = remaining(deadline);
                    let result = self.registry.invoke(&capability_key, arguments, call_deadline).await;

                    match result {
                        Ok(text) => {
                            self.sessions
                                .append(session_id, ChatTurn::capability_result(&capability_key, text, None))
                                .await;
                        }
                        Err(err) if err.is_capability_call_recoverable() => {
                            self.sessions
                                .append(
                                    session_id,
                                    ChatTurn::capability_result(&capability_key, String::new(), Some(err.to_string())),
                                )
                                .await;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn build_system_prompt(config: &AgentConfig, functions: &[(String, String)]) -> String {
    let capability_list = functions
        .iter()
        .map(|(name, description)| format!("- {name}: {description}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{base}\n{personality}\nAvailable capabilities:\n{capability_list}",
        base = config.base_system_prompt,
        personality = config.personality,
    )
}

/// Scripted adapter for tests: returns each configured decision in order,
/// ignoring the context it's handed. Not a production LLM integration.
#[cfg(any(test, feature = "test-support"))]
pub struct StubLlmAdapter {
    decisions: tokio::sync::Mutex<std::collections::VecDeque<AdapterDecision>>,
}

#[cfg(any(test, feature = "test-support"))]
impl StubLlmAdapter {
    pub fn new(decisions: Vec<AdapterDecision>) -> Self {
        Self {
            decisions: tokio::sync::Mutex::new(decisions.into()),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl LlmAdapter for StubLlmAdapter {
    async fn decide(
        &self,
        _system_prompt: &str,
        _history: &[ChatTurn],
        _available_functions: &[(String, String)],
        _deadline: Instant,
    ) -> AgentResult<AdapterDecision> {
        self.decisions
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AgentError::llm("stub adapter ran out of scripted decisions"))
    }
}
