//! Live connection registry: authenticated user ⇄ transport binding.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use duet_common::{ConnectionId, PairingId, UserId};

use crate::registry::PairingRegistry;

/// What the registry may push down a connection's outbound channel. The
/// transport task owns the socket; the registry only signals it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame to write to the transport.
    Frame(String),
    /// The owner authenticated on a newer connection; close this one.
    Evict,
}

/// A registered live connection. The registry's entry is a non-owning
/// handle: dropping it never closes the socket, and `sender` is bounded.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub owner: UserId,
    pub pairing: PairingId,
    pub sender: mpsc::Sender<Outbound>,
}

/// Both maps live under one lock so register/unregister are atomic and
/// routing never observes them half-updated. The pairing registry is
/// consulted outside the guard; the two locks are never nested.
struct ConnState {
    conns: HashMap<ConnectionId, Connection>,
    by_user: HashMap<UserId, ConnectionId>,
}

pub struct ConnectionRegistry {
    pairings: Arc<PairingRegistry>,
    state: RwLock<ConnState>,
}

impl ConnectionRegistry {
    pub fn new(pairings: Arc<PairingRegistry>) -> Self {
        Self {
            pairings,
            state: RwLock::new(ConnState {
                conns: HashMap::new(),
                by_user: HashMap::new(),
            }),
        }
    }

    /// Bind a new transport to its authenticated owner. At most one
    /// connection per user: a prior one is dropped from the maps and told
    /// to close before the new one is installed.
    pub async fn register(
        &self,
        owner: &UserId,
        pairing: &PairingId,
        sender: mpsc::Sender<Outbound>,
    ) -> Connection {
        let conn = Connection {
            id: ConnectionId::new(),
            owner: owner.clone(),
            pairing: pairing.clone(),
            sender,
        };

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(old_id) = state.by_user.insert(owner.clone(), conn.id.clone()) {
            if let Some(old) = state.conns.remove(&old_id) {
                // try_send keeps the guard await-free; a full or closed
                // channel means the old task is already on its way out.
                let _ = old.sender.try_send(Outbound::Evict);
                info!(user_id = %owner, connection_id = %old_id, "evicted prior connection");
            }
        }
        state.conns.insert(conn.id.clone(), conn.clone());

        debug!(user_id = %owner, connection_id = %conn.id, "connection registered");
        conn
    }

    /// Remove all entries for a connection. Idempotent; a stale id left
    /// over from an eviction race never touches the owner's newer entry.
    pub async fn unregister(&self, id: &ConnectionId) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(conn) = state.conns.remove(id) {
            if state.by_user.get(&conn.owner) == Some(id) {
                state.by_user.remove(&conn.owner);
            }
            debug!(user_id = %conn.owner, connection_id = %id, "connection unregistered");
        }
    }

    /// The partner's current connection, if the pairing is complete and
    /// the partner is online. Absence is an expected state, not an error.
    pub async fn partner_connection_of(&self, id: &ConnectionId) -> Option<Connection> {
        let (owner, pairing) = {
            let state = self.state.read().await;
            let conn = state.conns.get(id)?;
            (conn.owner.clone(), conn.pairing.clone())
        };

        let partner = self.pairings.partner_of(&pairing, &owner).await?;

        let state = self.state.read().await;
        let partner_id = state.by_user.get(&partner)?;
        state.conns.get(partner_id).cloned()
    }

    pub async fn connection_of(&self, user: &UserId) -> Option<Connection> {
        let state = self.state.read().await;
        let id = state.by_user.get(user)?;
        state.conns.get(id).cloned()
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.state.read().await.conns.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
