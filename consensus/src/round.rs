//! Consensus round state machine — manages one proposal's lifecycle.
//!
//! A round moves propose → prepare → commit. Each phase collects signed
//! votes per node; a phase completes at `2f + 1` matching votes. If no
//! quorum forms within the timeout the round enters a new view: collected
//! votes are discarded, never carried over as acceptance. A finalized
//! round is immutable.

use std::collections::HashMap;

use veracity_crypto::verify_signature;
use veracity_messages::{vote_signing_payload, ConsensusPhase};
use veracity_types::{NodeId, ProposalId, PublicKey, Signature, Timestamp};

/// The lifecycle state of a consensus round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    /// Collecting prepare votes.
    Preparing,
    /// Prepare quorum reached; collecting commit votes.
    Committing,
    /// Commit quorum reached. Terminal; the value is immutable.
    Finalized,
    /// Abandoned after exhausting view changes or by caller cancellation.
    Abandoned,
}

/// The result of processing a vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote accepted and counted.
    Accepted,
    /// The voter already voted in this phase and view.
    Duplicate,
    /// The round is terminal, or the vote targets a different view.
    Ignored,
    /// The signature did not verify against the voter's key.
    InvalidSignature,
}

/// A single proposal's voting state.
#[derive(Clone, Debug)]
pub struct ConsensusRound {
    pub proposal_id: ProposalId,
    pub value: Vec<u8>,
    pub view: u64,
    pub phase: RoundPhase,
    prepare_votes: HashMap<NodeId, Signature>,
    commit_votes: HashMap<NodeId, Signature>,
    quorum: usize,
    view_changes: u32,
    pub created_at: Timestamp,
    pub phase_changed_at: Timestamp,
}

impl ConsensusRound {
    /// Open a round in the Preparing phase.
    pub fn new(
        proposal_id: ProposalId,
        value: Vec<u8>,
        view: u64,
        quorum: usize,
        now: Timestamp,
    ) -> Self {
        Self {
            proposal_id,
            value,
            view,
            phase: RoundPhase::Preparing,
            prepare_votes: HashMap::new(),
            commit_votes: HashMap::new(),
            quorum,
            view_changes: 0,
            created_at: now,
            phase_changed_at: now,
        }
    }

    /// Process a signed vote.
    ///
    /// The signature must cover the canonical payload for this round's
    /// proposal, view, and phase — a vote over any altered value can never
    /// match. Terminal rounds and foreign views ignore votes.
    pub fn record_vote(
        &mut self,
        voter: &NodeId,
        voter_key: &PublicKey,
        view: u64,
        phase: ConsensusPhase,
        signature: Signature,
    ) -> VoteOutcome {
        if matches!(self.phase, RoundPhase::Finalized | RoundPhase::Abandoned) {
            return VoteOutcome::Ignored;
        }
        if view != self.view {
            return VoteOutcome::Ignored;
        }

        let payload = vote_signing_payload(&self.proposal_id, self.view, phase);
        if !verify_signature(&payload, &signature, voter_key) {
            return VoteOutcome::InvalidSignature;
        }

        let votes = match phase {
            ConsensusPhase::Prepare => &mut self.prepare_votes,
            ConsensusPhase::Commit => &mut self.commit_votes,
        };
        if votes.contains_key(voter) {
            return VoteOutcome::Duplicate;
        }
        votes.insert(voter.clone(), signature);
        VoteOutcome::Accepted
    }

    pub fn prepare_count(&self) -> usize {
        self.prepare_votes.len()
    }

    pub fn commit_count(&self) -> usize {
        self.commit_votes.len()
    }

    /// Nodes whose commit votes are currently recorded.
    pub fn commit_voters(&self) -> Vec<NodeId> {
        self.commit_votes.keys().cloned().collect()
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn has_prepare_quorum(&self) -> bool {
        self.prepare_votes.len() >= self.quorum
    }

    pub fn has_commit_quorum(&self) -> bool {
        self.commit_votes.len() >= self.quorum
    }

    /// Move Preparing → Committing once the prepare quorum is in.
    ///
    /// Returns `true` on the transition edge.
    pub fn advance_to_commit(&mut self, now: Timestamp) -> bool {
        if self.phase == RoundPhase::Preparing && self.has_prepare_quorum() {
            self.phase = RoundPhase::Committing;
            self.phase_changed_at = now;
            return true;
        }
        false
    }

    /// Finalize once the commit quorum is in. Returns `true` on the edge.
    pub fn try_finalize(&mut self, now: Timestamp) -> bool {
        if matches!(self.phase, RoundPhase::Preparing | RoundPhase::Committing)
            && self.has_commit_quorum()
        {
            self.phase = RoundPhase::Finalized;
            self.phase_changed_at = now;
            return true;
        }
        false
    }

    /// Whether the current phase has sat without progress past the timeout.
    pub fn is_timed_out(&self, timeout_secs: u64, now: Timestamp) -> bool {
        !matches!(self.phase, RoundPhase::Finalized | RoundPhase::Abandoned)
            && self.phase_changed_at.has_expired(timeout_secs, now)
    }

    /// Start a fresh view: discard every collected vote and return to
    /// Preparing. Returns the new view number, or `None` once the change
    /// budget is exhausted (the round is abandoned).
    pub fn begin_view_change(&mut self, max_view_changes: u32, now: Timestamp) -> Option<u64> {
        if matches!(self.phase, RoundPhase::Finalized | RoundPhase::Abandoned) {
            return None;
        }
        if self.view_changes >= max_view_changes {
            self.phase = RoundPhase::Abandoned;
            self.phase_changed_at = now;
            return None;
        }
        self.view_changes += 1;
        self.view += 1;
        self.prepare_votes.clear();
        self.commit_votes.clear();
        self.phase = RoundPhase::Preparing;
        self.phase_changed_at = now;
        Some(self.view)
    }

    /// Jump to a specific later view (prompted by a peer's view change).
    pub fn adopt_view(&mut self, view: u64, now: Timestamp) -> bool {
        if matches!(self.phase, RoundPhase::Finalized | RoundPhase::Abandoned)
            || view <= self.view
        {
            return false;
        }
        self.view = view;
        self.prepare_votes.clear();
        self.commit_votes.clear();
        self.phase = RoundPhase::Preparing;
        self.phase_changed_at = now;
        true
    }

    /// Abandon locally. Votes already broadcast stay valid for peers —
    /// cancellation is local, not retroactive.
    pub fn abandon(&mut self, now: Timestamp) {
        if self.phase != RoundPhase::Finalized {
            self.phase = RoundPhase::Abandoned;
            self.phase_changed_at = now;
        }
    }
}
