//! Network message types for Veracity node-to-node communication.

use serde::{Deserialize, Serialize};
use veracity_types::{
    ContentHash, NodeId, ProposalId, Signature, Timestamp, VerificationLevel,
};

/// Wire protocol version carried in every header.
pub const PROTOCOL_VERSION: u16 = 1;

/// Header present on every network message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub protocol_version: u16,
    pub timestamp: Timestamp,
}

impl MessageHeader {
    pub fn new(message_type: MessageType, timestamp: Timestamp) -> Self {
        Self {
            message_type,
            protocol_version: PROTOCOL_VERSION,
            timestamp,
        }
    }
}

/// All message types in the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    // Consensus
    Propose,
    Prepare,
    Commit,
    ViewChange,

    // Content verification
    Verdict,
}

/// The consensus phase a vote belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusPhase {
    Prepare,
    Commit,
}

impl ConsensusPhase {
    fn wire_byte(&self) -> u8 {
        match self {
            Self::Prepare => 1,
            Self::Commit => 2,
        }
    }
}

/// A new value proposed for agreement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposeMessage {
    pub header: MessageHeader,
    pub proposal_id: ProposalId,
    pub value: Vec<u8>,
    pub view: u64,
    pub proposer: NodeId,
}

/// A signed prepare or commit vote for a proposal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteMessage {
    pub header: MessageHeader,
    pub proposal_id: ProposalId,
    pub view: u64,
    pub phase: ConsensusPhase,
    pub voter: NodeId,
    pub signature: Signature,
}

/// Request to abandon the current view and restart vote collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewChangeMessage {
    pub header: MessageHeader,
    pub proposal_id: ProposalId,
    pub new_view: u64,
    pub node: NodeId,
}

/// A node's verdict on a piece of content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerdictMessage {
    pub header: MessageHeader,
    pub content_hash: ContentHash,
    pub node_id: NodeId,
    pub level: VerificationLevel,
    pub cross_references: Vec<ContentHash>,
    pub disputed: bool,
    pub dispute_reasons: Vec<String>,
}

/// Envelope routed between node actors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ConsensusMessage {
    Propose(ProposeMessage),
    Vote(VoteMessage),
    ViewChange(ViewChangeMessage),
    Verdict(VerdictMessage),
}

impl ConsensusMessage {
    /// The sender recorded in the message body.
    pub fn sender(&self) -> &NodeId {
        match self {
            Self::Propose(m) => &m.proposer,
            Self::Vote(m) => &m.voter,
            Self::ViewChange(m) => &m.node,
            Self::Verdict(m) => &m.node_id,
        }
    }
}

/// Canonical byte payload a vote signature covers:
/// `proposal_id ∥ view (LE) ∥ phase byte`.
///
/// Both the signer and every verifier must derive votes from this exact
/// layout; a vote over an altered value hashes to a different proposal id
/// and can never count toward the original quorum.
pub fn vote_signing_payload(proposal_id: &ProposalId, view: u64, phase: ConsensusPhase) -> Vec<u8> {
    let mut payload = Vec::with_capacity(32 + 8 + 1);
    payload.extend_from_slice(proposal_id.as_bytes());
    payload.extend_from_slice(&view.to_le_bytes());
    payload.push(phase.wire_byte());
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_payload_is_phase_distinct() {
        let id = ProposalId::new([5u8; 32]);
        let prepare = vote_signing_payload(&id, 0, ConsensusPhase::Prepare);
        let commit = vote_signing_payload(&id, 0, ConsensusPhase::Commit);
        assert_ne!(prepare, commit);
    }

    #[test]
    fn signing_payload_is_view_distinct() {
        let id = ProposalId::new([5u8; 32]);
        let v0 = vote_signing_payload(&id, 0, ConsensusPhase::Prepare);
        let v1 = vote_signing_payload(&id, 1, ConsensusPhase::Prepare);
        assert_ne!(v0, v1);
    }

    #[test]
    fn envelope_bincode_roundtrip() {
        let msg = ConsensusMessage::Propose(ProposeMessage {
            header: MessageHeader::new(MessageType::Propose, Timestamp::new(1000)),
            proposal_id: ProposalId::new([1u8; 32]),
            value: b"proposed value".to_vec(),
            view: 0,
            proposer: NodeId::new("node-1"),
        });
        let bytes = bincode::serialize(&msg).unwrap();
        let decoded: ConsensusMessage = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.sender(), &NodeId::new("node-1"));
    }
}
