//! Pairing session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duet_common::{PairingId, UserId};

/// Stored lifecycle state of a session. Expiry is evaluated at read time;
/// `Expired` only appears after a hygiene sweep and never gates reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Pending,
    Paired,
    Expired,
}

/// One pairing attempt/result. Created `Pending`, mutated exactly once
/// (by the winning join) to `Paired`, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingSession {
    pub id: PairingId,
    pub code: String,
    pub creator: UserId,
    pub partner: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: SessionState,
}

impl PairingSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether a join could still consume this session.
    pub fn is_joinable(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Pending && !self.is_expired(now)
    }

    /// A session that can no longer do anything: never paired and past
    /// its join window (or already swept). Reads treat it as absent.
    pub fn is_dead(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            SessionState::Paired => false,
            SessionState::Expired => true,
            SessionState::Pending => self.is_expired(now),
        }
    }

    /// The other participant, if `user` belongs to this session.
    pub fn partner_of(&self, user: &UserId) -> Option<&UserId> {
        if *user == self.creator {
            self.partner.as_ref()
        } else if self.partner.as_ref() == Some(user) {
            Some(&self.creator)
        } else {
            None
        }
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        *user == self.creator || self.partner.as_ref() == Some(user)
    }
}

/// Read-only status snapshot returned by the pairing API.
/// `partner_present` reflects the stored partner field, not whether that
/// partner currently has a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingStatus {
    pub paired: bool,
    pub partner_present: bool,
}
