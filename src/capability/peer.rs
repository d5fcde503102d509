//! Peer agent client: talks A2A to another instance of this runtime.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use uuid::Uuid;

use crate::error::{AgentError, AgentResult};
use crate::types::{AgentCard, JsonRpcRequest, JsonRpcResponse};

const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// Resolves agent cards and forwards `message/send` calls to peer instances.
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// `GET` the well-known path and decode the agent card.
    pub async fn fetch_agent_card(&self, url: &str, deadline: Duration) -> AgentResult<AgentCard> {
        let base = url.trim_end_matches('/');
        let full_url = format!("{base}{AGENT_CARD_PATH}");

        tracing::debug!(url = %full_url, "fetching agent card");

        let response = self
            .http
            .get(&full_url)
            .timeout(deadline)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(url = %full_url, error = %e, "agent card fetch failed");
                AgentError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::transport(format!(
                "http {status} fetching agent card from {full_url}"
            )));
        }

        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| AgentError::protocol(format!("malformed agent card: {e}")))?;

        tracing::debug!(agent_id = %card.agent_id, "resolved peer agent card");
        Ok(card)
    }

    /// `POST` a `message/send` request and extract the final assistant
    /// text. A peer invocation never shares a caller's session: it carries
    /// a fresh session id unless the caller supplies one.
    pub async fn send_message(
        &self,
        url: &str,
        text: &str,
        session_id: Option<&str>,
        deadline: Duration,
    ) -> AgentResult<String> {
        let session_id = session_id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string());

        let request = JsonRpcRequest::new(
            Uuid::new_v4().to_string(),
            "message/send",
            serde_json::json!({
                "message": { "content": text },
                "sessionId": session_id,
            }),
        );

        tracing::debug!(url, "sending message to peer");

        let response = self
            .http
            .post(url)
            .timeout(deadline)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(url, error = %e, "peer send_message failed");
                AgentError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::transport(format!("http {status} from peer {url}")));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| AgentError::protocol(format!("malformed peer response: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(AgentError::remote(error.message, error.data));
        }

        let result = rpc_response
            .result
            .ok_or_else(|| AgentError::protocol("peer response carried neither result nor error"))?;

        result
            .pointer("/result/message/content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AgentError::protocol("peer response missing result.message.content"))
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}
