//! Streaming-HTTP capability client: speaks the wire protocol of a remote
//! tool endpoint (JSON-RPC 2.0, optionally SSE-framed, with an optional
//! stateful handshake).

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::error::{AgentError, AgentResult};
use crate::types::{JsonRpcRequest, JsonRpcResponse, ToolDescriptor};

const MCP_SESSION_HEADER: &str = "Mcp-Session-Id";
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Result of a successful `tools/call`. The remote's result payload is
/// opaque JSON; callers that need the text form use [`ToolResult::as_text`].
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub raw: serde_json::Value,
}

impl ToolResult {
    pub fn as_text(&self) -> String {
        match &self.raw {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Outcome of probing a url for the stateful handshake: `Some(session_id)`
/// if the remote returned one on `initialize`, `None` if the remote isn't
/// stateful (or doesn't speak `initialize` at all).
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub session_id: Option<String>,
}

/// Speaks the remote-tool wire format over HTTP. One client instance is
/// shared by every attached `ToolProvider` handle.
#[derive(Debug, Clone)]
pub struct ToolClient {
    http: reqwest::Client,
}

impl ToolClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Attempt the stateful handshake at `url`: send `initialize`, and if
    /// the remote responds with an `Mcp-Session-Id` header, follow up with
    /// the `notifications/initialized` notification carrying that header.
    /// Returns `Ok(HandshakeOutcome{session_id: None})` when the remote
    /// accepted `initialize` but declared itself stateless; propagates a
    /// transport/protocol error if `initialize` itself fails, since callers
    /// use this to help decide whether a url is a tool provider at all.
    pub async fn handshake(&self, url: &str, deadline: Duration) -> AgentResult<HandshakeOutcome> {
        let request = JsonRpcRequest::new(
            "init",
            "initialize",
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": "agent-fabric", "version": env!("CARGO_PKG_VERSION") },
            }),
        );

        let (response, headers) = self.send_raw(url, &request, deadline).await?;
        as_jsonrpc_result(response)?;

        let session_id = headers
            .get(MCP_SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(session_id) = &session_id {
            let notify = JsonRpcRequest::notification("notifications/initialized", serde_json::json!({}));
            self.send_notification(url, &notify, deadline, session_id).await?;
        }

        Ok(HandshakeOutcome { session_id })
    }

    pub async fn list_tools(
        &self,
        url: &str,
        session_id: Option<&str>,
        deadline: Duration,
    ) -> AgentResult<Vec<ToolDescriptor>> {
        let request = JsonRpcRequest::new("tools-list", "tools/list", serde_json::json!({}));
        let result = self.call(url, &request, session_id, deadline).await?;

        let tools = result
            .get("tools")
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        serde_json::from_value(tools)
            .map_err(|e| AgentError::protocol(format!("malformed tools/list result: {e}")))
    }

    pub async fn call_tool(
        &self,
        url: &str,
        session_id: Option<&str>,
        tool_name: &str,
        arguments: serde_json::Value,
        deadline: Duration,
    ) -> AgentResult<ToolResult> {
        let request = JsonRpcRequest::new(
            "tools-call",
            "tools/call",
            serde_json::json!({ "name": tool_name, "arguments": arguments }),
        );
        let result = self.call(url, &request, session_id, deadline).await?;
        Ok(ToolResult { raw: result })
    }

    async fn call(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        session_id: Option<&str>,
        deadline: Duration,
    ) -> AgentResult<serde_json::Value> {
        let (response, _headers) = self.send_with_session(url, request, deadline, session_id).await?;
        as_jsonrpc_result(response)
    }

    async fn send_with_session(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        deadline: Duration,
        session_id: Option<&str>,
    ) -> AgentResult<(JsonRpcResponse, reqwest::header::HeaderMap)> {
        if session_id.is_none() {
            tracing::debug!(url, method = %request.method, "capability call without session id");
        }
        self.send_raw_with_header(url, request, deadline, session_id).await
    }

    async fn send_raw(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        deadline: Duration,
    ) -> AgentResult<(JsonRpcResponse, reqwest::header::HeaderMap)> {
        self.send_raw_with_header(url, request, deadline, None).await
    }

    /// Post a JSON-RPC notification (no `id`, no response body to decode).
    /// Only the HTTP status is checked.
    async fn send_notification(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        deadline: Duration,
        session_id: &str,
    ) -> AgentResult<()> {
        tracing::debug!(url, method = %request.method, "sending capability notification");

        let response = self
            .http
            .post(url)
            .timeout(deadline)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .header(MCP_SESSION_HEADER, session_id)
            .json(request)
            .send()
            .await
            .map_err(AgentError::from)?;

        if !response.status().is_success() {
            return Err(AgentError::transport(format!(
                "http {} from {url} sending notification",
                response.status()
            )));
        }
        Ok(())
    }

    async fn send_raw_with_header(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        deadline: Duration,
        session_id: Option<&str>,
    ) -> AgentResult<(JsonRpcResponse, reqwest::header::HeaderMap)> {
        tracing::debug!(url, method = %request.method, "sending capability request");

        let mut builder = self
            .http
            .post(url)
            .timeout(deadline)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(request);

        if let Some(session_id) = session_id {
            builder = builder.header(MCP_SESSION_HEADER, session_id);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(url, error = %e, "capability request failed");
            AgentError::from(e)
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| AgentError::transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(AgentError::transport(format!(
                "http {status} from {url}: {body}"
            )));
        }

        let rpc_response = decode_body(&content_type, &body)?;
        tracing::debug!(url, method = %request.method, "capability response decoded");
        Ok((rpc_response, headers))
    }
}

impl Default for ToolClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a response body as either a plain JSON-RPC object or a
/// Server-Sent-Events stream whose concatenated `data:` lines decode to one
/// JSON-RPC response. Both framings are accepted indistinguishably.
fn decode_body(content_type: &str, body: &str) -> AgentResult<JsonRpcResponse> {
    let looks_like_sse = content_type.contains("text/event-stream") || body.trim_start().starts_with("data:");

    let json_text = if looks_like_sse {
        let data: String = body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("");
        if data.is_empty() {
            return Err(AgentError::transport("SSE stream carried no data lines"));
        }
        data
    } else {
        body.to_string()
    };

    serde_json::from_str(&json_text)
        .map_err(|e| AgentError::protocol(format!("response does not decode as JSON-RPC: {e}")))
}

fn as_jsonrpc_result(response: JsonRpcResponse) -> AgentResult<serde_json::Value> {
    if let Some(error) = response.error {
        return Err(AgentError::remote(error.message, error.data));
    }
    response
        .result
        .ok_or_else(|| AgentError::protocol("JSON-RPC response carried neither result nor error"))
}
