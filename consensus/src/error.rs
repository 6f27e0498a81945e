use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Retryable: not enough matching votes arrived.
    #[error("quorum not reached: have {have}, need {need}")]
    QuorumNotReached { have: usize, need: usize },

    /// Retryable: the round deadline elapsed; partial votes are discarded.
    #[error("consensus round timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("unknown proposal: {0}")]
    UnknownProposal(String),

    #[error("proposal {0} is already finalized")]
    AlreadyFinalized(String),

    #[error("view-change limit ({0}) exhausted")]
    ViewChangeLimit(u32),
}
