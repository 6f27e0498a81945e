//! Partition-aware message routing between node mailboxes.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::trace;

use crate::error::NetworkError;
use veracity_messages::ConsensusMessage;
use veracity_types::NodeId;

/// Outcome counters for a broadcast attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryResult {
    /// Mailboxes the message was queued for.
    pub sent: usize,
    /// Deliveries suppressed by a partition boundary.
    pub partitioned: usize,
    /// Mailboxes that were full or closed.
    pub failed: usize,
}

/// Registry of node mailboxes with partition assignment.
///
/// Every node starts in partition 0. [`Router::set_partitions`] splits the
/// network; [`Router::heal`] restores full connectivity. Healing does not
/// reconcile anything the partitions finalized independently — that takes
/// a fresh proposal.
pub struct Router {
    mailboxes: RwLock<HashMap<NodeId, mpsc::Sender<ConsensusMessage>>>,
    partitions: RwLock<HashMap<NodeId, u32>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            mailboxes: RwLock::new(HashMap::new()),
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a node's mailbox. The node joins partition 0.
    pub async fn register(&self, node: NodeId, sender: mpsc::Sender<ConsensusMessage>) {
        self.mailboxes.write().await.insert(node.clone(), sender);
        self.partitions.write().await.insert(node, 0);
    }

    /// Whether two nodes can currently exchange messages.
    pub async fn connected(&self, a: &NodeId, b: &NodeId) -> bool {
        let partitions = self.partitions.read().await;
        match (partitions.get(a), partitions.get(b)) {
            (Some(pa), Some(pb)) => pa == pb,
            _ => false,
        }
    }

    /// Deliver a message to one peer, honoring partitions.
    pub async fn send(
        &self,
        from: &NodeId,
        to: &NodeId,
        message: ConsensusMessage,
    ) -> Result<(), NetworkError> {
        let sender = {
            let mailboxes = self.mailboxes.read().await;
            mailboxes
                .get(to)
                .cloned()
                .ok_or_else(|| NetworkError::UnknownPeer(to.to_string()))?
        };
        if !self.connected(from, to).await {
            return Err(NetworkError::Partitioned(
                from.to_string(),
                to.to_string(),
            ));
        }
        sender
            .send(message)
            .await
            .map_err(|_| NetworkError::ChannelClosed(to.to_string()))
    }

    /// Deliver a message to every node in the sender's partition,
    /// including the sender's own mailbox.
    pub async fn broadcast(&self, from: &NodeId, message: ConsensusMessage) -> DeliveryResult {
        let mut result = DeliveryResult::default();
        let targets: Vec<(NodeId, mpsc::Sender<ConsensusMessage>)> = {
            let mailboxes = self.mailboxes.read().await;
            mailboxes
                .iter()
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };

        for (target, sender) in targets {
            if !self.connected(from, &target).await {
                result.partitioned += 1;
                continue;
            }
            match sender.send(message.clone()).await {
                Ok(()) => result.sent += 1,
                Err(_) => result.failed += 1,
            }
        }

        trace!(
            from = %from,
            sent = result.sent,
            partitioned = result.partitioned,
            failed = result.failed,
            "broadcast"
        );
        result
    }

    /// Split the network into the given groups. Group `i` becomes
    /// partition `i + 1`; nodes not named keep their current assignment.
    pub async fn set_partitions(&self, groups: &[Vec<NodeId>]) {
        let mut partitions = self.partitions.write().await;
        for (index, group) in groups.iter().enumerate() {
            for node in group {
                partitions.insert(node.clone(), index as u32 + 1);
            }
        }
    }

    /// Restore full connectivity: every node returns to partition 0.
    pub async fn heal(&self) {
        let mut partitions = self.partitions.write().await;
        for assignment in partitions.values_mut() {
            *assignment = 0;
        }
    }

    /// Registered node count.
    pub async fn len(&self) -> usize {
        self.mailboxes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mailboxes.read().await.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
