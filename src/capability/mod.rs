//! Capability providers: the streaming-HTTP tool client, the peer agent
//! client, and the in-process registry tying both kinds together.

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod peer;
pub mod registry;

#[cfg(feature = "client")]
pub use client::ToolClient;
#[cfg(feature = "client")]
pub use peer::PeerClient;
pub use registry::{CapabilityRegistry, HandleState};
