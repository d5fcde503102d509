//! Capability registry: the single in-process source of truth for what an
//! agent currently knows how to call.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{AgentError, AgentResult};
use crate::types::{
    sanitize_identifier, CapabilityHandle, CapabilityKind, CapabilitySummary, HistoryAction,
    HistoryEntry, ToolDescriptor,
};

#[cfg(feature = "client")]
use crate::capability::{client::ToolClient, peer::PeerClient};

/// Transient per-handle lifecycle state. `Probing` never appears in any
/// externally observable snapshot; it exists only while `add` is deciding
/// the handle's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Probing,
    Installed,
    Removing,
}

/// Outcome of a successful `add`. Mirrors the `tools/add` success result
/// shape from the external JSON-RPC surface.
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub url: String,
    pub kind: CapabilityKind,
    pub functions: Vec<String>,
    /// `true` if the url was already present (idempotent no-op add).
    pub already_present: bool,
}

/// Outcome of a `remove`.
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    pub url: String,
    pub removed: bool,
}

struct RegistryState {
    handles: Vec<CapabilityHandle>,
    history: Vec<HistoryEntry>,
    generation: u64,
}

/// Single in-process registry of attached capabilities. Reads (`list`,
/// `history`, snapshots) see a consistent point-in-time view; `add`/`remove`
/// are serialized against each other by holding the write lock for the
/// whole operation.
pub struct CapabilityRegistry {
    self_agent_id: String,
    state: RwLock<RegistryState>,
    #[cfg(feature = "client")]
    tool_client: ToolClient,
    #[cfg(feature = "client")]
    peer_client: PeerClient,
}

impl CapabilityRegistry {
    pub fn new(self_agent_id: impl Into<String>) -> Self {
        Self {
            self_agent_id: self_agent_id.into(),
            state: RwLock::new(RegistryState {
                handles: Vec::new(),
                history: Vec::new(),
                generation: 0,
            }),
            #[cfg(feature = "client")]
            tool_client: ToolClient::new(),
            #[cfg(feature = "client")]
            peer_client: PeerClient::new(),
        }
    }

    /// Current generation counter. Bumped synchronously, inside the same
    /// critical section as a successful `add`/`remove`, before that call
    /// returns — this is what lets the Agent Card Builder detect staleness
    /// with a cheap comparison instead of a broadcast listener.
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    #[cfg(feature = "client")]
    pub async fn add(&self, url: &str, deadline: Duration) -> AgentResult<AddOutcome> {
        {
            let mut state = self.state.write().await;
            if let Some(existing) = state.handles.iter().find(|h| h.url() == url) {
                let outcome = AddOutcome {
                    url: url.to_string(),
                    kind: existing.kind(),
                    functions: existing.function_names(),
                    already_present: true,
                };
                let summary = existing.summary();
                state.history.push(HistoryEntry {
                    action: HistoryAction::Add,
                    url: url.to_string(),
                    timestamp: Utc::now(),
                    session_preserved: true,
                    capability_summary: Some(summary),
                });
                return Ok(outcome);
            }
        }

        // Probing happens outside the write lock: resolving a handle
        // involves network I/O and must not block concurrent reads/other
        // adds' probing. The url-present recheck right before insertion
        // keeps add idempotent under concurrent callers.
        let handle = self.probe(url, deadline).await?;

        if let CapabilityHandle::PeerAgent { agent_card, .. } = &handle {
            if agent_card.agent_id == self.self_agent_id {
                return Err(AgentError::reject(format!(
                    "refusing to add self as a peer capability ({url})"
                )));
            }
        }

        let mut state = self.state.write().await;
        if let Some(existing) = state.handles.iter().find(|h| h.url() == url) {
            let outcome = AddOutcome {
                url: url.to_string(),
                kind: existing.kind(),
                functions: existing.function_names(),
                already_present: true,
            };
            let summary = existing.summary();
            state.history.push(HistoryEntry {
                action: HistoryAction::Add,
                url: url.to_string(),
                timestamp: Utc::now(),
                session_preserved: true,
                capability_summary: Some(summary),
            });
            return Ok(outcome);
        }

        let summary = handle.summary();
        let outcome = AddOutcome {
            url: url.to_string(),
            kind: handle.kind(),
            functions: handle.function_names(),
            already_present: false,
        };

        state.handles.push(handle);
        state.history.push(HistoryEntry {
            action: HistoryAction::Add,
            url: url.to_string(),
            timestamp: Utc::now(),
            session_preserved: true,
            capability_summary: Some(summary),
        });
        state.generation += 1;

        Ok(outcome)
    }

    #[cfg(feature = "client")]
    async fn probe(&self, url: &str, deadline: Duration) -> AgentResult<CapabilityHandle> {
        if let Ok(card) = self.peer_client.fetch_agent_card(url, deadline).await {
            let skills = card.skills.clone();
            let addressable_as = sanitize_identifier(&card.name);
            return Ok(CapabilityHandle::PeerAgent {
                url: url.to_string(),
                agent_card: card,
                skills,
                addressable_as,
            });
        }

        let handshake = self.tool_client.handshake(url, deadline).await.ok();
        let session_id = handshake.and_then(|h| h.session_id);

        let tools: Vec<ToolDescriptor> = self
            .tool_client
            .list_tools(url, session_id.as_deref(), deadline)
            .await?;

        Ok(CapabilityHandle::ToolProvider {
            url: url.to_string(),
            declared_name: url.to_string(),
            tools,
            transport_session: session_id,
        })
    }

    pub async fn remove(&self, url: &str) -> RemoveOutcome {
        let mut state = self.state.write().await;
        let before = state.handles.len();
        state.handles.retain(|h| h.url() != url);
        let removed = state.handles.len() < before;

        state.history.push(HistoryEntry {
            action: HistoryAction::Remove,
            url: url.to_string(),
            timestamp: Utc::now(),
            session_preserved: true,
            capability_summary: None,
        });
        state.generation += 1;

        RemoveOutcome {
            url: url.to_string(),
            removed,
        }
    }

    pub async fn list(&self) -> Vec<CapabilitySummary> {
        self.state.read().await.handles.iter().map(|h| h.summary()).collect()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.read().await.history.clone()
    }

    /// Ordered `(capability_key, description)` pairs exposed to the Turn
    /// Executor / LLM Adapter, with namespace collisions resolved by
    /// prefixing the colliding entry with its handle's scope key.
    pub async fn function_signatures(&self) -> Vec<(String, String)> {
        let state = self.state.read().await;
        canonical_function_keys(&state.handles)
            .into_iter()
            .map(|(key, _idx, description)| (key, description))
            .collect()
    }

    #[cfg(feature = "client")]
    pub async fn invoke(
        &self,
        capability_key: &str,
        arguments: serde_json::Value,
        deadline: Duration,
    ) -> AgentResult<String> {
        let (handle_idx, raw_name) = {
            let state = self.state.read().await;
            let keys = canonical_function_keys(&state.handles);
            let found = keys
                .into_iter()
                .find(|(key, _, _)| key == capability_key)
                .map(|(_, idx, _)| idx);
            let Some(idx) = found else {
                return Err(AgentError::unknown_capability(capability_key));
            };
            (idx, raw_function_name(&state.handles[idx], capability_key))
        };

        // Re-borrow read-only for the actual call; the handle may have been
        // removed between resolution and dispatch, in which case this call
        // legitimately fails as UnknownCapability rather than panicking.
        let state = self.state.read().await;
        let Some(handle) = state.handles.get(handle_idx) else {
            return Err(AgentError::unknown_capability(capability_key));
        };

        match handle {
            CapabilityHandle::ToolProvider {
                url,
                transport_session,
                ..
            } => {
                let result = self
                    .tool_client
                    .call_tool(url, transport_session.as_deref(), &raw_name, arguments, deadline)
                    .await?;
                Ok(result.as_text())
            }
            CapabilityHandle::PeerAgent { url, .. } => {
                let text = arguments
                    .get("text")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| arguments.to_string());
                self.peer_client.send_message(url, &text, None, deadline).await
            }
        }
    }
}

/// Compute the globally-unique `(key, handle_index, description)` triples
/// for every function every handle exposes, in insertion order. The first
/// handle to declare a given raw name keeps it unprefixed; later handles
/// declaring the same raw name get `<scope>.<name>`.
fn canonical_function_keys(handles: &[CapabilityHandle]) -> Vec<(String, usize, String)> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for (idx, handle) in handles.iter().enumerate() {
        let names = handle.function_names();
        let descriptions = handle.function_descriptions();
        let scope = match handle {
            CapabilityHandle::ToolProvider { declared_name, .. } => sanitize_identifier(declared_name),
            CapabilityHandle::PeerAgent { addressable_as, .. } => addressable_as.clone(),
        };

        for (name, description) in names.into_iter().zip(descriptions.into_iter()) {
            let key = if seen.contains(&name) {
                format!("{scope}.{name}")
            } else {
                name.clone()
            };
            seen.insert(name);
            out.push((key, idx, description));
        }
    }

    out
}

/// Recover the raw (remote-facing) function name for a capability key that
/// canonical_function_keys may have prefixed.
fn raw_function_name(handle: &CapabilityHandle, capability_key: &str) -> String {
    match handle {
        CapabilityHandle::ToolProvider { declared_name, .. } => {
            let scope = sanitize_identifier(declared_name);
            capability_key
                .strip_prefix(&format!("{scope}."))
                .unwrap_or(capability_key)
                .to_string()
        }
        CapabilityHandle::PeerAgent { addressable_as, .. } => capability_key
            .strip_prefix(&format!("{addressable_as}."))
            .unwrap_or(capability_key)
            .to_string(),
    }
}
