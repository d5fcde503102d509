//! Error taxonomy shared across the capability client, registry, session
//! store, task manager, turn executor, and A2A endpoint.

use crate::types::JsonRpcError;

/// Errors a component can surface. Every variant carries enough context to
/// build either a `(capability-result, error=...)` history entry or a
/// JSON-RPC error object at the A2A boundary.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Network or framing failure talking to a capability endpoint or peer.
    #[error("transport error: {message}")]
    TransportError {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The remote endpoint returned a structured JSON-RPC error.
    #[error("remote error: {message}")]
    RemoteError {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Malformed JSON-RPC at any boundary.
    #[error("protocol error: {message}")]
    ProtocolError {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Dispatch to a capability no longer in the registry.
    #[error("unknown capability: {message}")]
    UnknownCapability {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The LLM Adapter failed.
    #[error("LLM error: {message}")]
    LLMError {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// A deadline elapsed.
    #[error("timeout: {message}")]
    Timeout {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Cooperative cancellation was observed.
    #[error("cancelled: {message}")]
    Cancelled {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// A hard capacity (e.g. tool-call budget) was exceeded.
    #[error("capacity exceeded: {message}")]
    CapacityExceeded {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Lookup of an unknown id (task, session, capability by exact key).
    #[error("not found: {message}")]
    NotFound {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Malformed params to an A2A method.
    #[error("rejected: {message}")]
    Reject {
        message: String,
        data: Option<serde_json::Value>,
    },
}

impl AgentError {
    pub fn transport(message: impl Into<String>) -> Self {
        AgentError::TransportError {
            message: message.into(),
            data: None,
        }
    }

    pub fn remote(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        AgentError::RemoteError {
            message: message.into(),
            data,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        AgentError::ProtocolError {
            message: message.into(),
            data: None,
        }
    }

    pub fn unknown_capability(key: impl Into<String>) -> Self {
        let key = key.into();
        AgentError::UnknownCapability {
            message: format!("no capability registered for '{key}'"),
            data: Some(serde_json::json!({ "capabilityKey": key })),
        }
    }

    pub fn llm(message: impl Into<String>) -> Self {
        AgentError::LLMError {
            message: message.into(),
            data: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        AgentError::Timeout {
            message: message.into(),
            data: None,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        AgentError::Cancelled {
            message: message.into(),
            data: None,
        }
    }

    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        AgentError::CapacityExceeded {
            message: message.into(),
            data: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AgentError::NotFound {
            message: message.into(),
            data: None,
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        AgentError::Reject {
            message: message.into(),
            data: None,
        }
    }

    /// JSON-RPC error code for this kind, per the configuration-surface
    /// code ranges: `-32700..-32600` for protocol-adjacent kinds,
    /// `-32001..-32099` for the rest.
    pub fn code(&self) -> i64 {
        match self {
            AgentError::ProtocolError { .. } => -32700,
            AgentError::Reject { .. } => -32602,
            AgentError::NotFound { .. } => -32001,
            AgentError::UnknownCapability { .. } => -32002,
            AgentError::TransportError { .. } => -32003,
            AgentError::RemoteError { .. } => -32004,
            AgentError::LLMError { .. } => -32005,
            AgentError::Timeout { .. } => -32006,
            AgentError::Cancelled { .. } => -32007,
            AgentError::CapacityExceeded { .. } => -32008,
        }
    }

    pub fn data(&self) -> Option<serde_json::Value> {
        match self {
            AgentError::TransportError { data, .. }
            | AgentError::RemoteError { data, .. }
            | AgentError::ProtocolError { data, .. }
            | AgentError::UnknownCapability { data, .. }
            | AgentError::LLMError { data, .. }
            | AgentError::Timeout { data, .. }
            | AgentError::Cancelled { data, .. }
            | AgentError::CapacityExceeded { data, .. }
            | AgentError::NotFound { data, .. }
            | AgentError::Reject { data, .. } => data.clone(),
        }
    }

    /// Is this error one that, raised mid-turn from a capability call,
    /// should be reified into the conversation rather than aborting the
    /// turn? Transport/remote/protocol/unknown-capability are recoverable
    /// in-turn; everything else is fatal.
    pub fn is_capability_call_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::TransportError { .. }
                | AgentError::RemoteError { .. }
                | AgentError::ProtocolError { .. }
                | AgentError::UnknownCapability { .. }
        )
    }
}

impl From<&AgentError> for JsonRpcError {
    fn from(err: &AgentError) -> Self {
        JsonRpcError {
            code: err.code(),
            message: err.to_string(),
            data: err.data(),
        }
    }
}

impl From<AgentError> for JsonRpcError {
    fn from(err: AgentError) -> Self {
        JsonRpcError::from(&err)
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::ProtocolError {
            message: err.to_string(),
            data: None,
        }
    }
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Timeout {
                message: err.to_string(),
                data: None,
            }
        } else {
            AgentError::TransportError {
                message: err.to_string(),
                data: None,
            }
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
