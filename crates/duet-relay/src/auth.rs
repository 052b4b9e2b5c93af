//! Bearer-token identity verification.
//!
//! The relay never trusts a client-supplied user label: the token handed
//! over in the hello frame is the only identity source, and the user id
//! it verifies to is the only key the registries are ever bound by.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64U;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use duet_common::{AuthError, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Seam between the relay and the identity service. Implementations must
/// reject anything questionable; the core only ever sees verified ids.
pub trait IdentityGate: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Verifies `user_id.expiry_unix.signature` bearer tokens, where the
/// signature is base64url(HMAC-SHA256(secret, "user_id.expiry_unix")).
///
/// Issuance lives with the identity service; [`HmacTokenGate::mint`] is
/// the shared-secret counterpart it (and the tests) use.
pub struct HmacTokenGate {
    secret: Vec<u8>,
}

impl HmacTokenGate {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token for `user` that verifies until `expires_at`.
    pub fn mint(&self, user: &UserId, expires_at: DateTime<Utc>) -> String {
        let signing = format!("{}.{}", user, expires_at.timestamp());
        let sig = B64U.encode(self.mac(&signing).finalize().into_bytes());
        format!("{signing}.{sig}")
    }

    fn mac(&self, input: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("hmac accepts keys of any length");
        mac.update(input.as_bytes());
        mac
    }
}

impl IdentityGate for HmacTokenGate {
    fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        // User ids never contain dots, so the two rightmost dots delimit
        // the three parts.
        let mut parts = token.rsplitn(3, '.');
        let (sig, expiry, user) = match (parts.next(), parts.next(), parts.next()) {
            (Some(sig), Some(expiry), Some(user)) if !user.is_empty() => (sig, expiry, user),
            _ => return Err(unauthenticated("malformed token")),
        };

        // Signature first: expiry and user are untrusted until it checks
        // out. verify_slice compares in constant time.
        let sig_bytes = B64U
            .decode(sig)
            .map_err(|_| unauthenticated("bad signature encoding"))?;
        self.mac(&format!("{user}.{expiry}"))
            .verify_slice(&sig_bytes)
            .map_err(|_| unauthenticated("bad signature"))?;

        let expiry: i64 = expiry
            .parse()
            .map_err(|_| unauthenticated("bad expiry"))?;
        if Utc::now().timestamp() >= expiry {
            return Err(unauthenticated("token expired"));
        }

        Ok(UserId::from(user))
    }
}

impl fmt::Debug for HmacTokenGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacTokenGate")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn unauthenticated(cause: &str) -> AuthError {
    AuthError::Unauthenticated(cause.to_string())
}
