//! Client for a WebSocket room bridge: a sidecar that hosts the media SDK,
//! relays room events as JSON frames and accepts JSON commands.

mod client;
pub mod types;

pub use client::{ACK_TIMEOUT, BridgeClient, BridgeError, BridgeEvents, connect};
