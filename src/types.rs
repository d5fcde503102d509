//! Core data model: wire types, capability/session/task entities, and the
//! agent's public self-description.
//!
//! Field names are chosen for readability, not because any wire format
//! mandates them; the wire (de)serialization lives on these same structs via
//! `serde` attributes so there is exactly one source of truth.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// JSON-RPC envelope
// ============================================================================

/// A JSON-RPC 2.0 request id — either a string, a number, or absent
/// (notifications carry no `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(i64),
    Null,
}

impl From<&str> for JsonRpcId {
    fn from(s: &str) -> Self {
        JsonRpcId::String(s.to_string())
    }
}

impl From<String> for JsonRpcId {
    fn from(s: String) -> Self {
        JsonRpcId::String(s)
    }
}

impl From<i64> for JsonRpcId {
    fn from(n: i64) -> Self {
        JsonRpcId::Number(n)
    }
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// Build a request with a fresh id.
    pub fn new(id: impl Into<JsonRpcId>, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Build a notification (no id, no response expected).
    pub fn notification(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response envelope. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// AgentConfig
// ============================================================================

/// Immutable per-process configuration, established at startup and never
/// mutated. See `SPEC_FULL.md` §3 and §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Stable identifier advertised in the card and used as a routing key
    /// in peer networks.
    pub agent_id: String,
    pub display_name: String,
    pub version: String,
    pub greeting: String,
    pub instructions: String,
    /// Free-form text appended to the system prompt.
    pub personality: String,
    pub llm_model: String,
    pub base_system_prompt: String,
    /// Ordered sequence of capability endpoints attached at boot.
    pub initial_capability_urls: Vec<String>,
    pub port: u16,
    pub max_tool_calls_per_turn: usize,
    pub turn_deadline_ms: u64,
}

impl AgentConfig {
    /// A valid registry-namespacing identifier derived from `display_name`:
    /// every character outside `[A-Za-z0-9_]` becomes `_`. See §4.3.
    pub fn sanitized_display_name(&self) -> String {
        sanitize_identifier(&self.display_name)
    }
}

/// Replace any character not in `[A-Za-z0-9_]` with `_`.
pub fn sanitize_identifier(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

// ============================================================================
// Capability model
// ============================================================================

/// One function a capability exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the function's arguments.
    pub input_schema: serde_json::Value,
}

/// Snapshot of the skills a capability declared at the moment it was added —
/// used both as the `HistoryEntry.capability_summary` and as one entry in
/// `Registry::list()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySummary {
    pub url: String,
    pub kind: CapabilityKind,
    pub names: Vec<String>,
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    ToolProvider,
    PeerAgent,
}

/// One attached capability. See `SPEC_FULL.md` §3.
#[derive(Debug, Clone)]
pub enum CapabilityHandle {
    ToolProvider {
        url: String,
        declared_name: String,
        tools: Vec<ToolDescriptor>,
        /// Opaque token (`Mcp-Session-Id`) for stateful remote servers.
        transport_session: Option<String>,
    },
    PeerAgent {
        url: String,
        agent_card: AgentCard,
        skills: Vec<AgentSkill>,
        /// Identifier derived from the peer's display name (see §4.3).
        addressable_as: String,
    },
}

impl CapabilityHandle {
    pub fn url(&self) -> &str {
        match self {
            CapabilityHandle::ToolProvider { url, .. } => url,
            CapabilityHandle::PeerAgent { url, .. } => url,
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            CapabilityHandle::ToolProvider { .. } => CapabilityKind::ToolProvider,
            CapabilityHandle::PeerAgent { .. } => CapabilityKind::PeerAgent,
        }
    }

    /// The callable function names this handle contributes to the turn
    /// executor's namespace, in declaration order.
    pub fn function_names(&self) -> Vec<String> {
        match self {
            CapabilityHandle::ToolProvider { tools, .. } => {
                tools.iter().map(|t| t.name.clone()).collect()
            }
            CapabilityHandle::PeerAgent {
                addressable_as,
                skills,
                ..
            } => skills
                .iter()
                .map(|s| format!("{}.{}", addressable_as, s.id))
                .collect(),
        }
    }

    pub fn function_descriptions(&self) -> Vec<String> {
        match self {
            CapabilityHandle::ToolProvider { tools, .. } => {
                tools.iter().map(|t| t.description.clone()).collect()
            }
            CapabilityHandle::PeerAgent { skills, .. } => {
                skills.iter().map(|s| s.description.clone()).collect()
            }
        }
    }

    pub fn summary(&self) -> CapabilitySummary {
        CapabilitySummary {
            url: self.url().to_string(),
            kind: self.kind(),
            names: self.function_names(),
            descriptions: self.function_descriptions(),
        }
    }
}

/// One entry in the capability registry's append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub session_preserved: bool,
    /// Snapshot of discovered function names + descriptions at the moment
    /// of `add`; empty for `remove`.
    pub capability_summary: Option<CapabilitySummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Add,
    Remove,
}

// ============================================================================
// AgentCard
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// The public self-description served at the well-known path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub agent_id: String,
    pub description: String,
    pub greeting: String,
    pub version: String,
    pub skills: Vec<AgentSkill>,
    pub transport: String,
    pub auth: String,
    pub supports_streaming: bool,
    pub supported_methods: Vec<String>,
}

// ============================================================================
// Session / ChatTurn
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    CapabilityCall,
    CapabilityResult,
}

/// One entry in a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set only for `capability_call`/`capability_result` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            capability_key: None,
            arguments: None,
            error: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            capability_key: None,
            arguments: None,
            error: None,
        }
    }

    pub fn capability_call(capability_key: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            role: Role::CapabilityCall,
            content: String::new(),
            timestamp: Utc::now(),
            capability_key: Some(capability_key.into()),
            arguments: Some(arguments),
            error: None,
        }
    }

    pub fn capability_result(
        capability_key: impl Into<String>,
        content: impl Into<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            role: Role::CapabilityResult,
            content: content.into(),
            timestamp: Utc::now(),
            capability_key: Some(capability_key.into()),
            arguments: None,
            error,
        }
    }
}

/// Per-session conversation history. See `SPEC_FULL.md` §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub last_touched_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// Task
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Cancelled)
    }
}

/// One unit of work created by an inbound A2A message. See
/// `SPEC_FULL.md` §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub session_id: String,
    pub status: TaskState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub inbound_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound_reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_identifier_replaces_invalid_chars() {
        assert_eq!(sanitize_identifier("HR Agent (v2)"), "HR_Agent__v2_");
        assert_eq!(sanitize_identifier("calc_9"), "calc_9");
    }

    #[test]
    fn task_state_terminal() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
    }

    #[test]
    fn task_state_display() {
        assert_eq!(TaskState::Submitted.to_string(), "submitted");
        assert_eq!(TaskState::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn json_rpc_id_untagged_roundtrip() {
        let id = JsonRpcId::String("abc".to_string());
        let v = serde_json::to_value(&id).unwrap();
        assert_eq!(v, serde_json::json!("abc"));

        let id = JsonRpcId::Number(7);
        let v = serde_json::to_value(&id).unwrap();
        assert_eq!(v, serde_json::json!(7));
    }

    #[test]
    fn capability_handle_function_names_namespaced_for_peers() {
        let handle = CapabilityHandle::PeerAgent {
            url: "http://peer/".to_string(),
            agent_card: AgentCard {
                name: "HR Agent".to_string(),
                agent_id: "hr-agent".to_string(),
                description: String::new(),
                greeting: String::new(),
                version: "1.0.0".to_string(),
                skills: vec![],
                transport: "http+json-rpc".to_string(),
                auth: "none".to_string(),
                supports_streaming: false,
                supported_methods: vec![],
            },
            skills: vec![AgentSkill {
                id: "lookup".to_string(),
                name: "Lookup".to_string(),
                description: "Look up an employee".to_string(),
            }],
            addressable_as: "HR_Agent".to_string(),
        };

        assert_eq!(handle.function_names(), vec!["HR_Agent.lookup".to_string()]);
    }
}
