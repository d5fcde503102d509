//! Minimal environment-driven configuration surface.
//!
//! This is not a CLI parser or a YAML loader (both remain out of scope);
//! it only covers the option surface a running instance of the core needs.

use std::env;

use crate::types::AgentConfig;

const DEFAULT_MAX_TOOL_CALLS_PER_TURN: usize = 16;
const DEFAULT_TURN_DEADLINE_MS: u64 = 30_000;
const DEFAULT_PORT: u16 = 8080;

impl AgentConfig {
    /// Build configuration from `A2A_*`-prefixed environment variables,
    /// falling back to sensible defaults for everything but `agent_id`
    /// and `display_name`.
    pub fn from_env() -> Self {
        let agent_id = env::var("A2A_AGENT_ID").unwrap_or_else(|_| "agent".to_string());
        let display_name = env::var("A2A_DISPLAY_NAME").unwrap_or_else(|_| "Agent".to_string());
        let version = env::var("A2A_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let greeting =
            env::var("A2A_GREETING").unwrap_or_else(|_| format!("Hello, I'm {display_name}."));
        let instructions = env::var("A2A_INSTRUCTIONS").unwrap_or_default();
        let personality = env::var("A2A_PERSONALITY").unwrap_or_default();
        let llm_model = env::var("A2A_LLM_MODEL").unwrap_or_else(|_| "stub".to_string());
        let base_system_prompt = env::var("A2A_SYSTEM_PROMPT").unwrap_or_default();

        let initial_capability_urls = env::var("A2A_INITIAL_CAPABILITY_URLS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let port = env::var("A2A_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let max_tool_calls_per_turn = env::var("A2A_MAX_TOOL_CALLS_PER_TURN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOOL_CALLS_PER_TURN);

        let turn_deadline_ms = env::var("A2A_TURN_DEADLINE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TURN_DEADLINE_MS);

        AgentConfig {
            agent_id,
            display_name,
            version,
            greeting,
            instructions,
            personality,
            llm_model,
            base_system_prompt,
            initial_capability_urls,
            port,
            max_tool_calls_per_turn,
            turn_deadline_ms,
        }
    }
}
