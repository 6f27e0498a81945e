use thiserror::Error;
use veracity_proof::ProofError;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("source is revoked: {0}")]
    SourceRevoked(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session has expired: {0}")]
    SessionExpired(String),

    #[error("channel not found for session {0}")]
    ChannelNotFound(String),

    #[error("source verification is stale: last verified {elapsed}s ago, limit {limit}s")]
    VerificationStale { elapsed: u64, limit: u64 },

    #[error("source has never completed verification")]
    NeverVerified,

    #[error("secure random source unavailable")]
    RngUnavailable,

    #[error("malformed verification record: {0}")]
    MalformedRecord(String),

    #[error("channel sealing failed")]
    ChannelSeal,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Proof(#[from] ProofError),
}
