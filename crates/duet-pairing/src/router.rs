//! Relay routing: one inbound frame in, at most one partner delivery out.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use duet_common::{ConnectionId, RelayMessage};

use crate::connections::{ConnectionRegistry, Outbound};

/// Forwards transient frames between the two parties of a pairing.
///
/// Delivery is best-effort, now-or-never: an offline partner, a full
/// outbound channel, a malformed frame, or an unrecognized type all end
/// in a silent drop. The sender is never told — routing outcomes do not
/// propagate back, so a failed delivery cannot disturb the connection
/// that sent the frame.
pub struct RelayRouter {
    connections: Arc<ConnectionRegistry>,
}

impl RelayRouter {
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self { connections }
    }

    /// Classify `raw` and forward it, unchanged, to the sender's partner.
    ///
    /// Only the `type` discriminator is parsed; the payload is opaque and
    /// the original text is what the partner receives. Payloads are never
    /// logged in full.
    pub async fn route(&self, from: &ConnectionId, raw: &str) {
        let kind = match RelayMessage::peek_kind(raw) {
            Some(kind) => kind,
            None => {
                warn!(connection_id = %from, "dropping malformed relay frame");
                return;
            }
        };
        if !kind.is_recognized() {
            warn!(connection_id = %from, "dropping relay frame of unrecognized type");
            return;
        }

        let partner = match self.connections.partner_connection_of(from).await {
            Some(partner) => partner,
            None => {
                // Expected whenever the other side is offline or the
                // pairing is still pending. Not an error.
                debug!(connection_id = %from, kind = ?kind, "partner offline, frame dropped");
                return;
            }
        };

        match partner.sender.try_send(Outbound::Frame(raw.to_string())) {
            Ok(()) => {
                trace!(
                    from = %from,
                    to = %partner.id,
                    kind = ?kind,
                    "frame forwarded"
                );
            }
            Err(TrySendError::Full(_)) => {
                warn!(
                    from = %from,
                    to = %partner.id,
                    kind = ?kind,
                    "partner channel full, frame dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                // The partner task is tearing down; its registry entries
                // are about to disappear too.
                debug!(to = %partner.id, "partner channel closed, frame dropped");
            }
        }
    }
}
