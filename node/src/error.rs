use thiserror::Error;
use veracity_consensus::ConsensusError;
use veracity_network::NetworkError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("node control channel closed")]
    ControlChannelClosed,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
