//! Axum integration: the A2A HTTP surface.
//!
//! - `GET /.well-known/agent-card.json` — agent card discovery.
//! - `POST /` — JSON-RPC 2.0 dispatch for all A2A methods.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::card::CachedAgentCard;
use crate::types::{AgentConfig, JsonRpcRequest};

use super::dispatcher::Dispatcher;

struct AppState {
    dispatcher: Arc<Dispatcher>,
    config: AgentConfig,
    card_cache: Arc<CachedAgentCard>,
}

/// Build the A2A router. Wrapped in `TraceLayer` for request/response span
/// logging, the way a CORS layer would be added if one were requested.
pub fn a2a_router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = Arc::new(AppState {
        config: dispatcher.config.clone(),
        card_cache: dispatcher.card_cache.clone(),
        dispatcher,
    });

    Router::new()
        .route("/.well-known/agent-card.json", get(handle_agent_card))
        .route("/", post(handle_jsonrpc))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_agent_card(State(state): State<Arc<AppState>>) -> Response {
    let card = state
        .card_cache
        .get(&state.config, &state.dispatcher.registry)
        .await;
    Json(card).into_response()
}

async fn handle_jsonrpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let response = state.dispatcher.handle(request).await;
    Json(response).into_response()
}
