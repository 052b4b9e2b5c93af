pub mod errors;
pub mod id;
pub mod message;

pub use errors::{AuthError, PairingError};
pub use id::{new_id, ConnectionId, PairingId, UserId};
pub use message::{MessageKind, RelayMessage};
