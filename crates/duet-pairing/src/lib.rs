//! Pairing lifecycle and relay routing for exactly two participants.
//!
//! [`PairingRegistry`] turns a short-lived human-typed code into a
//! confirmed two-party pairing. [`ConnectionRegistry`] maps live
//! transport connections to the authenticated users that own them.
//! [`RelayRouter`] forwards transient frames from one participant's
//! connection to the partner's, deliver-now-or-never.
//!
//! All state is owned by injectable registry objects; nothing here talks
//! to a socket, which keeps the core testable without a transport layer.

pub mod code;
pub mod connections;
pub mod registry;
pub mod router;
pub mod session;

pub use connections::{Connection, ConnectionRegistry, Outbound};
pub use registry::{PairingConfig, PairingRegistry};
pub use router::RelayRouter;
pub use session::{PairingSession, PairingStatus, SessionState};
