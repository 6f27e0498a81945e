use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofError {
    /// Rejected before any cryptographic work begins.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Structurally inconsistent serialized proof data.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("secure random source unavailable")]
    RngUnavailable,

    #[error("verification exceeded its deadline of {0:?}")]
    Timeout(std::time::Duration),
}
