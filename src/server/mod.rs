//! A2A HTTP endpoint: JSON-RPC method dispatch plus agent-card discovery.
//!
//! - [`Dispatcher`] — routes one decoded JSON-RPC request to the Task
//!   Manager, Turn Executor, or Capability Registry.
//! - [`a2a_router`] — ready-made axum routes wiring a `Dispatcher` to HTTP.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agent_fabric::server::{a2a_router, Dispatcher};
//!
//! let app = a2a_router(Arc::new(dispatcher));
//! let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod dispatcher;
pub mod http;

pub use dispatcher::Dispatcher;
pub use http::a2a_router;
