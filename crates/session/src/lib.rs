//! Realtime room session: connection lifecycle, token issuance, audio sinks,
//! and the event pump that feeds the face's state mapper.

mod client;
pub mod config;
pub mod identity;
pub mod sinks;
pub mod token;

pub use client::{ConnectOutcome, ConnectionStatus, SessionClient, SessionError};
pub use config::{ConfigError, SessionConfig};
pub use identity::{UserIdentity, room_and_identity};
pub use token::{ConfiguredIssuer, EndpointTokenIssuer, LocalTokenSigner, TokenError, TokenIssuer};
