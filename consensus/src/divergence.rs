//! Divergence detection — catch nodes that vote for conflicting proposals.
//!
//! A node may cast exactly one vote per (view, phase). Two votes for
//! different proposal ids in the same slot constitute equivocation —
//! evidence of a faulty or malicious participant. Observations are
//! recorded and surfaced as `byzantine_detected`; the node is flagged but
//! never forcibly corrected.

use std::collections::{HashMap, HashSet};

use veracity_messages::ConsensusPhase;
use veracity_types::{NodeId, ProposalId, Timestamp};

/// Evidence that a node voted for two different proposals in one slot.
#[derive(Clone, Debug)]
pub struct DivergenceObservation {
    pub node: NodeId,
    pub view: u64,
    pub phase: ConsensusPhase,
    /// First proposal the node voted for.
    pub first: ProposalId,
    /// Second (conflicting) proposal.
    pub second: ProposalId,
    pub detected_at: Timestamp,
}

/// Tracks one vote per (node, view, phase) slot and records conflicts.
#[derive(Debug, Default)]
pub struct DivergenceDetector {
    votes: HashMap<(NodeId, u64, ConsensusPhase), ProposalId>,
    observations: Vec<DivergenceObservation>,
    flagged: HashSet<NodeId>,
}

impl DivergenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote slot.
    ///
    /// Returns `Some(observation)` on a conflict with a previously
    /// recorded vote in the same slot, `None` otherwise (including exact
    /// duplicates).
    pub fn record_vote(
        &mut self,
        node: &NodeId,
        view: u64,
        phase: ConsensusPhase,
        proposal: &ProposalId,
        now: Timestamp,
    ) -> Option<DivergenceObservation> {
        let key = (node.clone(), view, phase);

        match self.votes.get(&key) {
            Some(existing) if existing != proposal => {
                let observation = DivergenceObservation {
                    node: node.clone(),
                    view,
                    phase,
                    first: *existing,
                    second: *proposal,
                    detected_at: now,
                };
                self.observations.push(observation.clone());
                self.flagged.insert(node.clone());
                Some(observation)
            }
            Some(_) => None,
            None => {
                self.votes.insert(key, *proposal);
                None
            }
        }
    }

    /// Whether a node has ever been observed equivocating.
    pub fn is_flagged(&self, node: &NodeId) -> bool {
        self.flagged.contains(node)
    }

    /// All observations collected so far.
    pub fn observations(&self) -> &[DivergenceObservation] {
        &self.observations
    }

    /// Whether any divergence has been observed.
    pub fn any_detected(&self) -> bool {
        !self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeId {
        NodeId::new(name)
    }

    fn proposal(byte: u8) -> ProposalId {
        ProposalId::new([byte; 32])
    }

    #[test]
    fn first_vote_is_clean() {
        let mut det = DivergenceDetector::new();
        let result = det.record_vote(
            &node("a"),
            0,
            ConsensusPhase::Prepare,
            &proposal(1),
            Timestamp::new(1_000),
        );
        assert!(result.is_none());
        assert!(!det.any_detected());
    }

    #[test]
    fn duplicate_vote_is_not_divergence() {
        let mut det = DivergenceDetector::new();
        det.record_vote(
            &node("a"),
            0,
            ConsensusPhase::Prepare,
            &proposal(1),
            Timestamp::new(1_000),
        );
        let result = det.record_vote(
            &node("a"),
            0,
            ConsensusPhase::Prepare,
            &proposal(1),
            Timestamp::new(1_001),
        );
        assert!(result.is_none());
    }

    #[test]
    fn conflicting_vote_is_detected_and_flags_node() {
        let mut det = DivergenceDetector::new();
        det.record_vote(
            &node("a"),
            0,
            ConsensusPhase::Prepare,
            &proposal(1),
            Timestamp::new(1_000),
        );
        let observation = det
            .record_vote(
                &node("a"),
                0,
                ConsensusPhase::Prepare,
                &proposal(2),
                Timestamp::new(1_001),
            )
            .expect("conflict should be observed");

        assert_eq!(observation.first, proposal(1));
        assert_eq!(observation.second, proposal(2));
        assert!(det.is_flagged(&node("a")));
        assert_eq!(det.observations().len(), 1);
    }

    #[test]
    fn different_views_are_independent_slots() {
        let mut det = DivergenceDetector::new();
        det.record_vote(
            &node("a"),
            0,
            ConsensusPhase::Prepare,
            &proposal(1),
            Timestamp::new(1_000),
        );
        let result = det.record_vote(
            &node("a"),
            1,
            ConsensusPhase::Prepare,
            &proposal(2),
            Timestamp::new(1_001),
        );
        assert!(result.is_none());
    }

    #[test]
    fn phases_are_independent_slots() {
        let mut det = DivergenceDetector::new();
        det.record_vote(
            &node("a"),
            0,
            ConsensusPhase::Prepare,
            &proposal(1),
            Timestamp::new(1_000),
        );
        let result = det.record_vote(
            &node("a"),
            0,
            ConsensusPhase::Commit,
            &proposal(2),
            Timestamp::new(1_001),
        );
        assert!(result.is_none());
    }
}
