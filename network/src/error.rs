use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("mailbox for {0} is closed")]
    ChannelClosed(String),

    #[error("peers {0} and {1} are in different partitions")]
    Partitioned(String, String),
}
