use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntangleError {
    #[error("cannot entangle an empty fragment set")]
    EmptyFragmentSet,

    #[error("malformed entanglement data: {0}")]
    MalformedEntanglement(String),
}
