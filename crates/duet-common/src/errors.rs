#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing, malformed, tampered, or expired identity token. The cause
    /// string is for logs only; callers see one uniform rejection.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    /// Unknown, expired, or already-consumed code or session id. The three
    /// causes are deliberately indistinguishable to the caller.
    #[error("pairing not found")]
    NotFound,

    #[error("cannot pair with yourself")]
    SelfPairing,

    /// Code generation gave up after the bounded number of attempts.
    #[error("pairing code space exhausted")]
    CollisionRetryExhausted,
}

impl PairingError {
    /// Stable wire name for error frames.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PairingError::NotFound => "not_found",
            PairingError::SelfPairing => "self_pairing",
            PairingError::CollisionRetryExhausted => "retry_exhausted",
        }
    }
}
