//! Fake remote capability server used by the integration tests:
//! speaks just enough of the wire protocol from `SPEC_FULL.md` §4.1
//! (`initialize`/`notifications/initialized` handshake, `tools/list`,
//! `tools/call`, optional SSE framing) to exercise the capability client
//! and registry without a real tool provider.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

pub struct FakeServerState {
    pub requires_session: bool,
    pub issued_session_id: Option<String>,
    pub sse_mode: bool,
    pub calls: Vec<(String, Value)>,
}

pub struct FakeServer {
    pub state: Arc<Mutex<FakeServerState>>,
    pub base_url: String,
}

impl FakeServer {
    /// Start a fake tool server offering a single `echo(text)` tool on a
    /// random local port.
    pub async fn start(requires_session: bool, sse_mode: bool) -> Self {
        let state = Arc::new(Mutex::new(FakeServerState {
            requires_session,
            issued_session_id: None,
            sse_mode,
            calls: Vec::new(),
        }));

        let app = Router::new()
            .route("/mcp", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{addr}/mcp"),
        }
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

async fn handle(State(state): State<Arc<Mutex<FakeServerState>>>, headers: HeaderMap, body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return (StatusCode::BAD_REQUEST, "bad json").into_response(),
    };

    let method = request.get("method").and_then(|v| v.as_str()).unwrap_or_default();
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    let session_header = headers
        .get("Mcp-Session-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (requires_session, expected_session, sse_mode) = {
        let s = state.lock().unwrap();
        (s.requires_session, s.issued_session_id.clone(), s.sse_mode)
    };

    if requires_session && expected_session.is_some() && method != "initialize" {
        if session_header != expected_session {
            return frame(
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32004, "message": "session lost: missing or stale Mcp-Session-Id" }
                }),
                sse_mode,
                None,
            );
        }
    }

    match method {
        "initialize" => {
            let mut session_id = None;
            if requires_session {
                let sid = uuid::Uuid::new_v4().to_string();
                state.lock().unwrap().issued_session_id = Some(sid.clone());
                session_id = Some(sid);
            }
            frame(
                json!({ "jsonrpc": "2.0", "id": id, "result": { "protocolVersion": "2024-11-05" } }),
                sse_mode,
                session_id.as_deref(),
            )
        }
        "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
        "tools/list" => frame(
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": [
                        { "name": "echo", "description": "echoes text back", "input_schema": { "type": "object" } }
                    ]
                }
            }),
            sse_mode,
            None,
        ),
        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or(Value::Null);
            let name = params.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
            state.lock().unwrap().calls.push((name.clone(), arguments.clone()));

            let text = arguments.get("text").and_then(|v| v.as_str()).unwrap_or("").to_string();
            frame(
                json!({ "jsonrpc": "2.0", "id": id, "result": text }),
                sse_mode,
                None,
            )
        }
        other => frame(
            json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32601, "message": format!("unknown method {other}") } }),
            sse_mode,
            None,
        ),
    }
}

/// Fake peer agent: serves an agent card at the well-known path and answers
/// `message/send` at the root with a canned reply, mirroring what a real
/// instance of this runtime exposes.
pub struct FakePeerServer {
    pub base_url: String,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakePeerServer {
    pub async fn start(agent_id: &str, name: &str, skill_id: &str, reply: &str) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let card = json!({
            "name": name,
            "agentId": agent_id,
            "description": "a fake peer agent",
            "greeting": "hi",
            "version": "1.0.0",
            "skills": [{ "id": skill_id, "name": skill_id, "description": format!("performs {skill_id}") }],
            "transport": "http+json-rpc",
            "auth": "none",
            "supportsStreaming": false,
            "supportedMethods": ["message/send"],
        });
        let reply = reply.to_string();

        let state = Arc::new(PeerState {
            card,
            reply,
            calls: calls.clone(),
        });

        let app = Router::new()
            .route("/.well-known/agent-card.json", axum::routing::get(peer_card))
            .route("/", post(peer_message_send))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            calls,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

struct PeerState {
    card: Value,
    reply: String,
    calls: Arc<Mutex<Vec<String>>>,
}

async fn peer_card(State(state): State<Arc<PeerState>>) -> Response {
    (StatusCode::OK, axum::Json(state.card.clone())).into_response()
}

async fn peer_message_send(State(state): State<Arc<PeerState>>, body: Bytes) -> Response {
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let text = request
        .pointer("/params/message/content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    state.calls.lock().unwrap().push(text);

    (
        StatusCode::OK,
        axum::Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "taskId": uuid::Uuid::new_v4().to_string(),
                "status": "completed",
                "result": { "message": { "role": "agent", "content": state.reply } }
            }
        })),
    )
        .into_response()
}

fn frame(body: Value, sse_mode: bool, session_id: Option<&str>) -> Response {
    let mut response = if sse_mode {
        let data = format!("data: {}\n\n", body);
        ([("content-type", "text/event-stream")], data).into_response()
    } else {
        ([("content-type", "application/json")], body.to_string()).into_response()
    };

    if let Some(session_id) = session_id {
        response
            .headers_mut()
            .insert("Mcp-Session-Id", session_id.parse().unwrap());
    }

    response
}
