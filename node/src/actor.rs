//! The async consensus participant.
//!
//! One task per node. All coordination happens through messages delivered
//! by the router — an actor never touches another actor's state. The
//! per-node finalized store is read-mostly: lookups proceed concurrently,
//! finalization takes the exclusive section.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::verifier::NodeProfile;
use veracity_consensus::{
    ConsensusRound, DivergenceDetector, Verdict, VerdictAggregator, VoteOutcome,
};
use veracity_crypto::{hash_proposal, sign_message};
use veracity_messages::{
    vote_signing_payload, ConsensusMessage, ConsensusPhase, MessageHeader, MessageType,
    ProposeMessage, VerdictMessage, ViewChangeMessage, VoteMessage,
};
use veracity_network::{FaultProfile, Router};
use veracity_types::{
    ContentHash, KeyPair, NodeId, ProposalId, PublicKey, Timestamp, VerificationLevel,
};

/// Votes buffered per proposal that arrived before its Propose.
const PENDING_VOTE_CAP: usize = 64;

/// Control commands from the local owner of a node.
pub enum Control {
    /// Propose a value; replies with the proposal id.
    Propose {
        value: Vec<u8>,
        reply: oneshot::Sender<ProposalId>,
    },
    /// Broadcast this node's verdict on a piece of content.
    SubmitVerdict {
        content_hash: ContentHash,
        level: VerificationLevel,
        cross_references: Vec<ContentHash>,
        disputed: bool,
        dispute_reasons: Vec<String>,
    },
    /// Abandon a pending proposal locally. Votes already broadcast stay
    /// valid for peers.
    Cancel(ProposalId),
    Shutdown,
}

/// Static parameters for one actor.
#[derive(Clone, Debug)]
pub struct ActorConfig {
    /// Matching votes required per phase (`2f + 1`).
    pub quorum: usize,
    /// Seconds a round may stall before a view change.
    pub round_timeout_secs: u64,
    /// View changes before a proposal is abandoned.
    pub max_view_changes: u32,
    /// Timer granularity for timeout checks.
    pub tick_interval: Duration,
}

struct Actor {
    node_id: NodeId,
    keypair: KeyPair,
    directory: HashMap<NodeId, PublicKey>,
    fault: FaultProfile,
    config: ActorConfig,
    router: Arc<Router>,
    rounds: HashMap<ProposalId, ConsensusRound>,
    pending_votes: HashMap<ProposalId, Vec<VoteMessage>>,
    divergence: DivergenceDetector,
    finalized: Arc<RwLock<HashMap<ProposalId, Vec<u8>>>>,
    aggregator: Arc<RwLock<VerdictAggregator>>,
    /// This node's running estimate of every peer's reputation. Decayed
    /// on observed divergence, restored on honest finalization.
    profiles: Arc<RwLock<HashMap<NodeId, NodeProfile>>>,
}

/// Spawn a node actor task.
#[allow(clippy::too_many_arguments)]
pub fn spawn_actor(
    node_id: NodeId,
    keypair: KeyPair,
    directory: HashMap<NodeId, PublicKey>,
    fault: FaultProfile,
    config: ActorConfig,
    router: Arc<Router>,
    mut net_rx: mpsc::Receiver<ConsensusMessage>,
    mut control_rx: mpsc::Receiver<Control>,
    finalized: Arc<RwLock<HashMap<ProposalId, Vec<u8>>>>,
    aggregator: Arc<RwLock<VerdictAggregator>>,
    profiles: Arc<RwLock<HashMap<NodeId, NodeProfile>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.tick_interval);
        let mut actor = Actor {
            node_id,
            keypair,
            directory,
            fault,
            config,
            router,
            rounds: HashMap::new(),
            pending_votes: HashMap::new(),
            divergence: DivergenceDetector::new(),
            finalized,
            aggregator,
            profiles,
        };

        loop {
            tokio::select! {
                Some(message) = net_rx.recv() => actor.handle_message(message).await,
                Some(command) = control_rx.recv() => {
                    if !actor.handle_control(command).await {
                        break;
                    }
                }
                _ = ticker.tick() => actor.tick().await,
                else => break,
            }
        }
        debug!(node = %actor.node_id, "actor stopped");
    })
}

fn flipped(id: &ProposalId) -> ProposalId {
    let mut bytes = *id.as_bytes();
    for byte in &mut bytes {
        *byte ^= 0xFF;
    }
    ProposalId::new(bytes)
}

impl Actor {
    /// Fault-aware broadcast for non-vote messages.
    async fn dispatch(&self, message: ConsensusMessage) {
        match self.fault {
            FaultProfile::Mute => {
                debug!(node = %self.node_id, "mute node dropped outbound message");
            }
            _ => {
                self.router.broadcast(&self.node_id, message).await;
            }
        }
    }

    /// Sign and broadcast a vote. An equivocating node also broadcasts a
    /// conflicting vote for an altered proposal id in the same slot.
    async fn send_vote(&self, proposal_id: ProposalId, view: u64, phase: ConsensusPhase) {
        if self.fault == FaultProfile::Mute {
            debug!(node = %self.node_id, "mute node dropped vote");
            return;
        }

        let vote = self.make_vote(proposal_id, view, phase);
        self.router
            .broadcast(&self.node_id, ConsensusMessage::Vote(vote))
            .await;

        if self.fault == FaultProfile::Equivocating {
            let conflicting = self.make_vote(flipped(&proposal_id), view, phase);
            self.router
                .broadcast(&self.node_id, ConsensusMessage::Vote(conflicting))
                .await;
        }
    }

    fn make_vote(&self, proposal_id: ProposalId, view: u64, phase: ConsensusPhase) -> VoteMessage {
        let payload = vote_signing_payload(&proposal_id, view, phase);
        let message_type = match phase {
            ConsensusPhase::Prepare => MessageType::Prepare,
            ConsensusPhase::Commit => MessageType::Commit,
        };
        VoteMessage {
            header: MessageHeader::new(message_type, Timestamp::now()),
            proposal_id,
            view,
            phase,
            voter: self.node_id.clone(),
            signature: sign_message(&payload, &self.keypair.private),
        }
    }

    async fn handle_message(&mut self, message: ConsensusMessage) {
        match message {
            ConsensusMessage::Propose(m) => self.handle_propose(m).await,
            ConsensusMessage::Vote(m) => self.handle_vote(m).await,
            ConsensusMessage::ViewChange(m) => self.handle_view_change(m).await,
            ConsensusMessage::Verdict(m) => self.handle_verdict(m).await,
        }
    }

    async fn handle_propose(&mut self, m: ProposeMessage) {
        if hash_proposal(&m.value) != m.proposal_id {
            warn!(
                node = %self.node_id,
                proposer = %m.proposer,
                "proposal id does not hash to the proposed value"
            );
            return;
        }

        let now = Timestamp::now();
        let proposal_id = m.proposal_id;
        let view = match self.rounds.get(&proposal_id) {
            Some(round) => round.view,
            None => {
                debug!(node = %self.node_id, proposal = %proposal_id, "opened round");
                self.rounds.insert(
                    proposal_id,
                    ConsensusRound::new(
                        proposal_id,
                        m.value,
                        m.view,
                        self.config.quorum,
                        now,
                    ),
                );
                m.view
            }
        };

        self.send_vote(proposal_id, view, ConsensusPhase::Prepare).await;

        if let Some(buffered) = self.pending_votes.remove(&proposal_id) {
            for vote in buffered {
                self.handle_vote(vote).await;
            }
        }
    }

    async fn handle_vote(&mut self, m: VoteMessage) {
        let now = Timestamp::now();

        if let Some(observation) =
            self.divergence
                .record_vote(&m.voter, m.view, m.phase, &m.proposal_id, now)
        {
            warn!(
                node = %self.node_id,
                diverging = %observation.node,
                view = observation.view,
                "observed conflicting votes"
            );
            if let Some(profile) = self.profiles.write().await.get_mut(&observation.node) {
                profile.penalize_divergence();
            }
            self.aggregator.write().await.flag_byzantine(&m.voter);
        }

        let Some(voter_key) = self.directory.get(&m.voter).cloned() else {
            warn!(node = %self.node_id, voter = %m.voter, "vote from unknown node");
            return;
        };

        let (advanced, finalized_value, view) = {
            let Some(round) = self.rounds.get_mut(&m.proposal_id) else {
                let buffered = self.pending_votes.entry(m.proposal_id).or_default();
                if buffered.len() < PENDING_VOTE_CAP {
                    buffered.push(m);
                }
                return;
            };

            let outcome = round.record_vote(&m.voter, &voter_key, m.view, m.phase, m.signature);
            if outcome != VoteOutcome::Accepted {
                return;
            }

            let advanced = round.advance_to_commit(now);
            let finalized_value = round
                .try_finalize(now)
                .then(|| (round.value.clone(), round.commit_voters()));
            (advanced, finalized_value, round.view)
        };

        if advanced {
            debug!(node = %self.node_id, proposal = %m.proposal_id, "prepare quorum, committing");
            self.send_vote(m.proposal_id, view, ConsensusPhase::Commit).await;
        }

        if let Some((value, voters)) = finalized_value {
            info!(node = %self.node_id, proposal = %m.proposal_id, "finalized");
            self.finalized.write().await.insert(m.proposal_id, value);

            let mut profiles = self.profiles.write().await;
            for voter in voters {
                if let Some(profile) = profiles.get_mut(&voter) {
                    profile.reward_participation();
                }
            }
        }
    }

    async fn handle_view_change(&mut self, m: ViewChangeMessage) {
        let now = Timestamp::now();
        let adopted = self
            .rounds
            .get_mut(&m.proposal_id)
            .map(|round| round.adopt_view(m.new_view, now))
            .unwrap_or(false);

        if adopted {
            debug!(
                node = %self.node_id,
                proposal = %m.proposal_id,
                view = m.new_view,
                "adopted view"
            );
            self.send_vote(m.proposal_id, m.new_view, ConsensusPhase::Prepare)
                .await;
        }
    }

    async fn handle_verdict(&mut self, m: VerdictMessage) {
        let verdict = Verdict {
            node_id: m.node_id.clone(),
            level: m.level,
            cross_references: m.cross_references,
            disputed: m.disputed,
            dispute_reasons: m.dispute_reasons,
            submitted_at: m.header.timestamp,
        };
        self.aggregator.write().await.submit(m.content_hash, verdict);
    }

    /// Returns `false` on shutdown.
    async fn handle_control(&mut self, command: Control) -> bool {
        match command {
            Control::Propose { value, reply } => {
                let proposal_id = hash_proposal(&value);
                let _ = reply.send(proposal_id);
                let message = ConsensusMessage::Propose(ProposeMessage {
                    header: MessageHeader::new(MessageType::Propose, Timestamp::now()),
                    proposal_id,
                    value,
                    view: 0,
                    proposer: self.node_id.clone(),
                });
                info!(node = %self.node_id, proposal = %proposal_id, "proposing");
                self.dispatch(message).await;
            }
            Control::SubmitVerdict {
                content_hash,
                level,
                cross_references,
                disputed,
                dispute_reasons,
            } => {
                let message = ConsensusMessage::Verdict(VerdictMessage {
                    header: MessageHeader::new(MessageType::Verdict, Timestamp::now()),
                    content_hash,
                    node_id: self.node_id.clone(),
                    level,
                    cross_references,
                    disputed,
                    dispute_reasons,
                });
                self.dispatch(message).await;
            }
            Control::Cancel(proposal_id) => {
                if let Some(round) = self.rounds.get_mut(&proposal_id) {
                    round.abandon(Timestamp::now());
                    debug!(node = %self.node_id, proposal = %proposal_id, "cancelled locally");
                }
            }
            Control::Shutdown => return false,
        }
        true
    }

    async fn tick(&mut self) {
        let now = Timestamp::now();
        let mut view_changes: Vec<(ProposalId, u64, Vec<u8>)> = Vec::new();

        for (id, round) in &mut self.rounds {
            if round.is_timed_out(self.config.round_timeout_secs, now) {
                match round.begin_view_change(self.config.max_view_changes, now) {
                    Some(new_view) => view_changes.push((*id, new_view, round.value.clone())),
                    None => {
                        warn!(node = %self.node_id, proposal = %id, "round abandoned");
                    }
                }
            }
        }

        for (proposal_id, new_view, value) in view_changes {
            debug!(
                node = %self.node_id,
                proposal = %proposal_id,
                view = new_view,
                "view change"
            );
            self.dispatch(ConsensusMessage::ViewChange(ViewChangeMessage {
                header: MessageHeader::new(MessageType::ViewChange, Timestamp::now()),
                proposal_id,
                new_view,
                node: self.node_id.clone(),
            }))
            .await;
            // Re-broadcast the proposal so peers that never saw it (e.g.
            // across a healed partition) can open the round.
            self.dispatch(ConsensusMessage::Propose(ProposeMessage {
                header: MessageHeader::new(MessageType::Propose, Timestamp::now()),
                proposal_id,
                value,
                view: new_view,
                proposer: self.node_id.clone(),
            }))
            .await;
            self.send_vote(proposal_id, new_view, ConsensusPhase::Prepare)
                .await;
        }
    }
}
