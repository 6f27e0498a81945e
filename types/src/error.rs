//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for the Veracity network.
#[derive(Debug, Error)]
pub enum VeracityError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("malformed entanglement data: {0}")]
    MalformedEntanglement(String),

    #[error("secure random source unavailable")]
    RngUnavailable,

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session has expired: {0}")]
    SessionExpired(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("quorum not reached: have {have}, need {need}")]
    QuorumNotReached { have: usize, need: usize },

    #[error("operation timed out after {0}s")]
    Timeout(u64),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}
