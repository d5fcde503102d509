//! Agent card builder: pure projection of `(AgentConfig, registry snapshot)`
//! onto the public self-description.

use crate::capability::CapabilityRegistry;
use crate::types::{AgentCard, AgentConfig, AgentSkill, CapabilityKind};

/// Methods every endpoint supports, including the legacy/peer-oriented
/// aliases.
pub const SUPPORTED_METHODS: &[&str] = &[
    "message/send",
    "send-task",
    "tasks/get",
    "tasks/cancel",
    "tools/add",
    "tools/remove",
    "tools/list",
    "tools/history",
    "agents/add",
    "agents/remove",
    "agents/list",
    "agents/history",
];

/// Project the current registry snapshot into an `AgentCard`. Each tool's
/// name becomes a skill entry with its description; each peer agent
/// contributes one skill per skill in its cached card, already namespaced
/// by `CapabilityHandle::function_names`.
pub async fn build_agent_card(config: &AgentConfig, registry: &CapabilityRegistry) -> AgentCard {
    let summaries = registry.list().await;

    let mut skills = Vec::new();
    for summary in &summaries {
        let origin = match summary.kind {
            CapabilityKind::ToolProvider => "tool",
            CapabilityKind::PeerAgent => "peer",
        };
        for (name, description) in summary.names.iter().zip(summary.descriptions.iter()) {
            skills.push(AgentSkill {
                id: format!("{origin}:{name}"),
                name: name.clone(),
                description: description.clone(),
            });
        }
    }

    AgentCard {
        name: config.display_name.clone(),
        agent_id: config.agent_id.clone(),
        description: config.instructions.clone(),
        greeting: config.greeting.clone(),
        version: config.version.clone(),
        skills,
        transport: "http+json-rpc".to_string(),
        auth: "none".to_string(),
        supports_streaming: false,
        supported_methods: SUPPORTED_METHODS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Caches the last-rendered card alongside the registry generation it was
/// built from, so the A2A endpoint only re-projects when the registry has
/// actually changed since the last `GET`.
pub struct CachedAgentCard {
    card: tokio::sync::RwLock<(u64, AgentCard)>,
}

impl CachedAgentCard {
    pub async fn new(config: &AgentConfig, registry: &CapabilityRegistry) -> Self {
        let card = build_agent_card(config, registry).await;
        let generation = registry.generation().await;
        Self {
            card: tokio::sync::RwLock::new((generation, card)),
        }
    }

    /// Return the cached card, re-rendering first if the registry's
    /// generation has advanced since the last render.
    pub async fn get(&self, config: &AgentConfig, registry: &CapabilityRegistry) -> AgentCard {
        let current_generation = registry.generation().await;
        {
            let cached = self.card.read().await;
            if cached.0 == current_generation {
                return cached.1.clone();
            }
        }

        let fresh = build_agent_card(config, registry).await;
        let mut cached = self.card.write().await;
        *cached = (current_generation, fresh.clone());
        fresh
    }
}
