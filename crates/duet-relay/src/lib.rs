//! duet-relay: WebSocket relay server for two-party pairings.
//!
//! Authenticates each socket with a bearer token, turns pairing codes
//! into confirmed two-party sessions, and forwards signaling and chat
//! frames between the two partners. The relay never inspects payloads
//! beyond the `type` discriminator, never buffers, and never persists —
//! a frame is delivered to the partner's live connection or dropped.

pub mod auth;
pub mod connection;
pub mod protocol;
pub mod server;

pub use auth::{HmacTokenGate, IdentityGate};
pub use server::{RelayConfig, RelayState};
