//! # agent-fabric — runtime core for a hierarchical multi-agent A2A fabric
//!
//! This crate implements the generic A2A agent runtime shared by every node
//! in a fabric of cooperating agent processes: the A2A protocol endpoint
//! (agent card discovery + JSON-RPC dispatch), the task lifecycle manager,
//! the session store, the dynamic capability registry (tool providers and
//! peer agents), and the LLM-driven turn executor.
//!
//! Concrete LLM providers, concrete tool servers, process launchers, CLI
//! parsing, and YAML config loaders are out of scope — this crate specifies
//! and implements the contracts between them.
//!
//! ## Feature flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `client` | yes     | Outbound capability/peer clients (reqwest) + the Turn Executor, which depends on them |
//! | `server` | yes     | Inbound A2A HTTP endpoint (axum + tower-http) |
//! | `full`   | no      | Alias enabling both |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agent_fabric::capability::CapabilityRegistry;
//! use agent_fabric::card::CachedAgentCard;
//! use agent_fabric::executor::TurnExecutor;
//! use agent_fabric::server::{a2a_router, Dispatcher};
//! use agent_fabric::session::SessionStore;
//! use agent_fabric::task::TaskManager;
//! use agent_fabric::types::AgentConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::from_env();
//!     let registry = Arc::new(CapabilityRegistry::new(config.agent_id.clone()));
//!     let sessions = Arc::new(SessionStore::new());
//!     let tasks = Arc::new(TaskManager::new());
//!     let adapter = Arc::new(my_llm_adapter::Adapter::new(&config.llm_model));
//!     let executor = Arc::new(TurnExecutor::new(sessions, registry.clone(), adapter));
//!     let card_cache = Arc::new(CachedAgentCard::new(&config, &registry).await);
//!
//!     let port = config.port;
//!     let dispatcher = Arc::new(Dispatcher::new(config, tasks, registry, executor, card_cache));
//!     let app = a2a_router(dispatcher);
//!
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`capability::client::ToolClient`] / [`capability::peer::PeerClient`] — leaf clients
//!   speaking, respectively, the streaming-HTTP tool wire format and the
//!   A2A protocol to other agent instances.
//! - [`capability::registry::CapabilityRegistry`] — ordered, addressable table of
//!   attached capabilities; notifies the Agent Card Builder on change via a
//!   generation counter.
//! - [`session::SessionStore`] — per-session append-only conversation history.
//! - [`task::TaskManager`] — lifecycle record for every inbound message.
//! - [`card`] — pure projection `(AgentConfig, registry snapshot) → AgentCard`.
//! - [`executor::TurnExecutor`] — orchestrates session history, the registry,
//!   and an [`executor::LlmAdapter`] to produce one assistant reply per turn.
//! - [`server::Dispatcher`] / [`server::a2a_router`] — top layer: HTTP + JSON-RPC.

pub mod config;
pub mod error;
pub mod types;

pub mod card;
pub mod session;
pub mod task;

#[cfg(feature = "client")]
pub mod capability;
#[cfg(feature = "client")]
pub mod executor;

#[cfg(feature = "server")]
pub mod server;

/// Re-exports commonly used types and traits. `use agent_fabric::prelude::*;`
pub mod prelude {
    pub use crate::error::{AgentError, AgentResult};
    pub use crate::types::{
        AgentCard, AgentConfig, AgentSkill, CapabilityHandle, ChatTurn, HistoryEntry, Role,
        Session, Task, TaskState, ToolDescriptor,
    };

    #[cfg(feature = "client")]
    pub use crate::capability::{CapabilityRegistry, PeerClient, ToolClient};

    #[cfg(feature = "client")]
    pub use crate::executor::{AdapterDecision, LlmAdapter, TurnExecutor};

    pub use crate::card::{build_agent_card, CachedAgentCard};
    pub use crate::session::SessionStore;
    pub use crate::task::TaskManager;

    #[cfg(feature = "server")]
    pub use crate::server::{a2a_router, Dispatcher};
}

pub use error::{AgentError, AgentResult};
pub use types::*;
