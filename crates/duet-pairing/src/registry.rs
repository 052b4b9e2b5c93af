//! Pairing session registry: code issuance, joining, status reads.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use duet_common::{PairingError, PairingId, UserId};

use crate::code;
use crate::session::{PairingSession, PairingStatus, SessionState};

/// Tunables for the pairing lifecycle.
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// How long a code stays joinable after creation.
    pub ttl: Duration,
    /// Bounded attempts at finding a free code before giving up.
    pub max_code_attempts: u32,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            max_code_attempts: 32,
        }
    }
}

/// Both maps live under a single lock so code allocation is an atomic
/// check-and-insert and the Pending→Paired transition is exactly-once
/// under concurrent joins. Nothing awaits while the guard is held.
struct PairingState {
    sessions: HashMap<PairingId, PairingSession>,
    by_code: HashMap<String, PairingId>,
}

/// Owns the lifecycle of pairing codes and sessions.
pub struct PairingRegistry {
    config: PairingConfig,
    state: RwLock<PairingState>,
}

impl PairingRegistry {
    pub fn new(config: PairingConfig) -> Self {
        Self {
            config,
            state: RwLock::new(PairingState {
                sessions: HashMap::new(),
                by_code: HashMap::new(),
            }),
        }
    }

    /// Create a Pending session under a code no other live session holds.
    pub async fn create(&self, creator: &UserId) -> Result<PairingSession, PairingError> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        for _ in 0..self.config.max_code_attempts {
            let candidate = code::generate();

            // A code is only reserved while its session is still a live
            // Pending one; consumed and expired sessions don't block reuse.
            if let Some(existing) = state.by_code.get(&candidate) {
                let taken = state
                    .sessions
                    .get(existing)
                    .map(|s| s.is_joinable(now))
                    .unwrap_or(false);
                if taken {
                    continue;
                }
            }

            let session = PairingSession {
                id: PairingId::new(),
                code: candidate.clone(),
                creator: creator.clone(),
                partner: None,
                created_at: now,
                expires_at: now + self.config.ttl,
                state: SessionState::Pending,
            };
            state.by_code.insert(candidate, session.id.clone());
            state.sessions.insert(session.id.clone(), session.clone());

            info!(session_id = %session.id, user_id = %creator, "pairing created");
            return Ok(session);
        }

        warn!(
            attempts = self.config.max_code_attempts,
            "no free pairing code found"
        );
        Err(PairingError::CollisionRetryExhausted)
    }

    /// Consume a code: exactly one concurrent join wins the Pending→Paired
    /// transition; everyone else sees `NotFound`. A creator joining their
    /// own code gets `SelfPairing` whenever the record still exists.
    pub async fn join(&self, code: &str, joiner: &UserId) -> Result<PairingSession, PairingError> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let id = state
            .by_code
            .get(code)
            .cloned()
            .ok_or(PairingError::NotFound)?;
        let session = state.sessions.get_mut(&id).ok_or(PairingError::NotFound)?;

        if session.creator == *joiner {
            return Err(PairingError::SelfPairing);
        }
        if !session.is_joinable(now) {
            return Err(PairingError::NotFound);
        }

        session.partner = Some(joiner.clone());
        session.state = SessionState::Paired;

        info!(session_id = %session.id, user_id = %joiner, "pairing joined");
        Ok(session.clone())
    }

    /// Status snapshot. Unknown ids and dead sessions answer `NotFound`;
    /// a Paired session reports paired forever.
    pub async fn status(&self, id: &PairingId) -> Result<PairingStatus, PairingError> {
        let now = Utc::now();
        let state = self.state.read().await;

        let session = state.sessions.get(id).ok_or(PairingError::NotFound)?;
        if session.is_dead(now) {
            return Err(PairingError::NotFound);
        }

        Ok(PairingStatus {
            paired: session.state == SessionState::Paired,
            partner_present: session.partner.is_some(),
        })
    }

    /// The session, if `user` is one of its participants and it is still
    /// alive. Non-members get `NotFound` rather than a membership hint.
    pub async fn member_session(
        &self,
        id: &PairingId,
        user: &UserId,
    ) -> Result<PairingSession, PairingError> {
        let now = Utc::now();
        let state = self.state.read().await;

        let session = state.sessions.get(id).ok_or(PairingError::NotFound)?;
        if session.is_dead(now) || !session.is_member(user) {
            return Err(PairingError::NotFound);
        }
        Ok(session.clone())
    }

    /// The other participant of a live session, from `user`'s side.
    pub async fn partner_of(&self, id: &PairingId, user: &UserId) -> Option<UserId> {
        let now = Utc::now();
        let state = self.state.read().await;
        let session = state.sessions.get(id)?;
        if session.is_dead(now) {
            return None;
        }
        session.partner_of(user).cloned()
    }

    /// Hygiene pass: flip past-TTL Pending sessions to Expired and free
    /// their codes. Correctness never depends on this running; every read
    /// path re-checks expiry itself.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let expired: Vec<PairingId> = state
            .sessions
            .values()
            .filter(|s| s.state == SessionState::Pending && s.is_expired(now))
            .map(|s| s.id.clone())
            .collect();

        for id in &expired {
            if let Some(session) = state.sessions.get_mut(id) {
                session.state = SessionState::Expired;
                debug!(session_id = %id, "pairing expired");
                if state.by_code.get(&session.code) == Some(id) {
                    state.by_code.remove(&session.code);
                }
            }
        }
        expired.len()
    }

    /// Number of stored sessions (all states).
    pub async fn len(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for PairingRegistry {
    fn default() -> Self {
        Self::new(PairingConfig::default())
    }
}
