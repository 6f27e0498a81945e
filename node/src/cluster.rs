//! In-process consensus cluster — builds and drives a `3f + 1` network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::actor::{spawn_actor, ActorConfig, Control};
use crate::error::NodeError;
use crate::verifier::NodeProfile;

use veracity_consensus::{ConsensusError, VerdictAggregator, VerificationStatus};
use veracity_crypto::keypair_from_seed;
use veracity_messages::ConsensusMessage;
use veracity_network::{FaultProfile, Router};
use veracity_types::{ContentHash, NodeId, ProposalId, PublicKey, VerificationLevel};

/// Mailbox depth per node.
const NET_CHANNEL_CAPACITY: usize = 1024;
/// Control channel depth per node.
const CONTROL_CHANNEL_CAPACITY: usize = 64;
/// Poll interval while awaiting agreement.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Reputation every peer starts with.
const INITIAL_REPUTATION: f64 = 0.9;

/// One spawned node and the handles the cluster keeps to observe it.
///
/// The finalized store and aggregator are the node's own state; the
/// cluster only ever reads them.
pub struct ClusterNode {
    pub node_id: NodeId,
    pub public_key: PublicKey,
    pub fault: FaultProfile,
    control: mpsc::Sender<Control>,
    finalized: Arc<RwLock<HashMap<ProposalId, Vec<u8>>>>,
    aggregator: Arc<RwLock<VerdictAggregator>>,
    profiles: Arc<RwLock<HashMap<NodeId, NodeProfile>>>,
    join: JoinHandle<()>,
}

/// A running network of node actors connected by an in-process router.
pub struct Cluster {
    router: Arc<Router>,
    nodes: Vec<ClusterNode>,
    quorum: usize,
}

impl Cluster {
    /// Spawn `node_count` nodes with quorum `2f + 1`.
    ///
    /// `faults` assigns non-honest profiles by node index (test only).
    pub async fn new(
        node_count: usize,
        fault_tolerance: u32,
        faults: &[(usize, FaultProfile)],
    ) -> Self {
        Self::with_round_timeout(node_count, fault_tolerance, faults, 2).await
    }

    /// Spawn with an explicit round timeout in seconds.
    pub async fn with_round_timeout(
        node_count: usize,
        fault_tolerance: u32,
        faults: &[(usize, FaultProfile)],
        round_timeout_secs: u64,
    ) -> Self {
        let quorum = 2 * fault_tolerance as usize + 1;
        let router = Arc::new(Router::new());

        let directory: HashMap<NodeId, PublicKey> = (0..node_count)
            .map(|i| {
                let kp = keypair_from_seed(&node_seed(i));
                (node_id(i), kp.public)
            })
            .collect();

        let config = ActorConfig {
            quorum,
            round_timeout_secs,
            max_view_changes: 3,
            tick_interval: Duration::from_millis(100),
        };

        let profile_seed: HashMap<NodeId, NodeProfile> = directory
            .iter()
            .map(|(id, key)| {
                (
                    id.clone(),
                    NodeProfile {
                        node_id: id.clone(),
                        public_key: key.clone(),
                        reputation: INITIAL_REPUTATION,
                        weight: INITIAL_REPUTATION,
                        specialties: Vec::new(),
                        capacity: 16,
                    },
                )
            })
            .collect();

        let mut nodes = Vec::with_capacity(node_count);
        for i in 0..node_count {
            let id = node_id(i);
            let keypair = keypair_from_seed(&node_seed(i));
            let public_key = keypair.public.clone();
            let fault = faults
                .iter()
                .find(|(index, _)| *index == i)
                .map(|(_, profile)| *profile)
                .unwrap_or_default();
            if fault.is_byzantine() {
                tracing::debug!(node = %id, profile = ?fault, "spawning byzantine node");
            }

            let (net_tx, net_rx) = mpsc::channel::<ConsensusMessage>(NET_CHANNEL_CAPACITY);
            let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
            router.register(id.clone(), net_tx).await;

            let finalized = Arc::new(RwLock::new(HashMap::new()));
            let aggregator = Arc::new(RwLock::new(VerdictAggregator::new(quorum)));
            let profiles = Arc::new(RwLock::new(profile_seed.clone()));

            let join = spawn_actor(
                id.clone(),
                keypair,
                directory.clone(),
                fault,
                config.clone(),
                Arc::clone(&router),
                net_rx,
                control_rx,
                Arc::clone(&finalized),
                Arc::clone(&aggregator),
                Arc::clone(&profiles),
            );

            nodes.push(ClusterNode {
                node_id: id,
                public_key,
                fault,
                control: control_tx,
                finalized,
                aggregator,
                profiles,
                join,
            });
        }

        Self {
            router,
            nodes,
            quorum,
        }
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.node_id.clone()).collect()
    }

    /// Propose a value from the given node. Returns the proposal id.
    pub async fn propose(&self, origin: usize, value: Vec<u8>) -> Result<ProposalId, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.nodes[origin]
            .control
            .send(Control::Propose { value, reply })
            .await
            .map_err(|_| NodeError::ControlChannelClosed)?;
        rx.await.map_err(|_| NodeError::ControlChannelClosed)
    }

    /// Wait until at least `quorum` nodes finalized the same value.
    pub async fn await_consensus(
        &self,
        proposal: &ProposalId,
        deadline: Duration,
    ) -> Result<Vec<u8>, NodeError> {
        self.await_agreement(proposal, self.quorum, deadline).await
    }

    /// Wait until at least `required` nodes finalized the same value for
    /// `proposal`. Exceeding the deadline surfaces as `Timeout`; partially
    /// collected votes are discarded by the nodes, not treated as acceptance.
    pub async fn await_agreement(
        &self,
        proposal: &ProposalId,
        required: usize,
        deadline: Duration,
    ) -> Result<Vec<u8>, NodeError> {
        let started = tokio::time::Instant::now();
        loop {
            let mut tallies: HashMap<Vec<u8>, usize> = HashMap::new();
            for node in &self.nodes {
                if let Some(value) = node.finalized.read().await.get(proposal) {
                    *tallies.entry(value.clone()).or_insert(0) += 1;
                }
            }
            if let Some((value, _)) = tallies.into_iter().find(|(_, count)| *count >= required) {
                return Ok(value);
            }
            if started.elapsed() >= deadline {
                return Err(ConsensusError::Timeout(deadline).into());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// A single node's finalized value for a proposal, if any.
    pub async fn get_consensus_value(
        &self,
        node: usize,
        proposal: &ProposalId,
    ) -> Option<Vec<u8>> {
        self.nodes[node].finalized.read().await.get(proposal).cloned()
    }

    /// Abandon a pending proposal on one node. Local only — votes the node
    /// already cast keep counting toward quorum elsewhere.
    pub async fn cancel(&self, node: usize, proposal: ProposalId) -> Result<(), NodeError> {
        self.nodes[node]
            .control
            .send(Control::Cancel(proposal))
            .await
            .map_err(|_| NodeError::ControlChannelClosed)
    }

    /// Split the network into groups of node indices.
    pub async fn partition(&self, groups: &[Vec<usize>]) {
        let named: Vec<Vec<NodeId>> = groups
            .iter()
            .map(|group| group.iter().map(|&i| node_id(i)).collect())
            .collect();
        self.router.set_partitions(&named).await;
    }

    /// Restore full connectivity. Diverged finalizations are not
    /// reconciled; issue a fresh proposal to re-reach global quorum.
    pub async fn heal(&self) {
        self.router.heal().await;
    }

    /// Broadcast one node's verdict on a content hash.
    pub async fn submit_verdict(
        &self,
        node: usize,
        content_hash: ContentHash,
        level: VerificationLevel,
        cross_references: Vec<ContentHash>,
        disputed: bool,
        dispute_reasons: Vec<String>,
    ) -> Result<(), NodeError> {
        self.nodes[node]
            .control
            .send(Control::SubmitVerdict {
                content_hash,
                level,
                cross_references,
                disputed,
                dispute_reasons,
            })
            .await
            .map_err(|_| NodeError::ControlChannelClosed)
    }

    /// One node's aggregated view of a content hash.
    pub async fn verification_status(
        &self,
        node: usize,
        content_hash: &ContentHash,
    ) -> Option<VerificationStatus> {
        self.nodes[node].aggregator.read().await.status(content_hash)
    }

    /// Reputation-weighted trust score from one node's perspective,
    /// using that node's own running reputation estimates.
    pub async fn trust_score(&self, node: usize, content_hash: &ContentHash) -> f64 {
        let reputations: HashMap<NodeId, f64> = self.nodes[node]
            .profiles
            .read()
            .await
            .iter()
            .map(|(id, profile)| (id.clone(), profile.reputation))
            .collect();
        self.nodes[node]
            .aggregator
            .read()
            .await
            .trust_score(content_hash, &reputations)
    }

    /// One node's current estimate of a peer's reputation.
    pub async fn reputation_of(&self, observer: usize, peer: usize) -> Option<f64> {
        self.nodes[observer]
            .profiles
            .read()
            .await
            .get(&node_id(peer))
            .map(|profile| profile.reputation)
    }

    /// Stop every actor and wait for the tasks to drain.
    pub async fn shutdown(self) {
        for node in &self.nodes {
            let _ = node.control.send(Control::Shutdown).await;
        }
        for node in self.nodes {
            if tokio::time::timeout(Duration::from_secs(1), node.join)
                .await
                .is_err()
            {
                tracing::warn!(node = %node.node_id, "actor did not stop in time");
            }
        }
    }
}

fn node_id(index: usize) -> NodeId {
    NodeId::new(format!("node-{index}"))
}

fn node_seed(index: usize) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[0] = (index as u8).wrapping_add(1);
    seed
}
