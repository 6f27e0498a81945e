//! Node fault profiles for Byzantine testing.

/// How a node misbehaves, if at all. Test/debug only — production nodes
/// are constructed `Honest`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaultProfile {
    /// Follows the protocol.
    #[default]
    Honest,
    /// Silently drops every outbound message.
    Mute,
    /// Sends conflicting votes: one for the real proposal and one for an
    /// altered value.
    Equivocating,
}

impl FaultProfile {
    pub fn is_byzantine(&self) -> bool {
        !matches!(self, Self::Honest)
    }
}
