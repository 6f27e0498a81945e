//! Entanglement graph construction.

use crate::error::EntangleError;
use serde::{Deserialize, Serialize};
use veracity_crypto::{blake2b_256, blake2b_256_multi};

/// How dependency edges are wired between fragment nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyPolicy {
    /// Every node depends on all strictly earlier nodes (a total order).
    /// Truncation and reordering are both detectable.
    #[default]
    FullOrder,
    /// Every node depends only on its immediate predecessor.
    Sequential,
}

impl DependencyPolicy {
    /// Dependency indices for the node at `index`.
    fn dependencies(&self, index: usize) -> Vec<usize> {
        match self {
            Self::FullOrder => (0..index).collect(),
            Self::Sequential => {
                if index == 0 {
                    Vec::new()
                } else {
                    vec![index - 1]
                }
            }
        }
    }
}

/// One fragment's position in the entanglement graph.
///
/// Dependencies are attached before hashing; the node hash is computed
/// once and immutable thereafter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntanglementNode {
    /// Position of the fragment in the submitted order.
    pub index: usize,
    /// Blake2b digest of the fragment payload.
    pub payload_hash: [u8; 32],
    /// Indices of the sibling nodes this node depends on (all earlier).
    pub dependency_refs: Vec<usize>,
    /// Digest chaining the payload hash through every dependency's node hash.
    pub node_hash: [u8; 32],
}

/// A complete entanglement graph over an ordered fragment set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntanglementGraph {
    pub nodes: Vec<EntanglementNode>,
    pub policy: DependencyPolicy,
    /// Fold of every node hash plus the node count.
    pub root_hash: [u8; 32],
}

impl EntanglementGraph {
    /// Build a graph over `fragments` with the given dependency policy.
    ///
    /// Deterministic: identical fragments and policy always produce an
    /// identical graph.
    pub fn build(
        fragments: &[Vec<u8>],
        policy: DependencyPolicy,
    ) -> Result<Self, EntangleError> {
        if fragments.is_empty() {
            return Err(EntangleError::EmptyFragmentSet);
        }

        let mut nodes: Vec<EntanglementNode> = Vec::with_capacity(fragments.len());

        for (index, fragment) in fragments.iter().enumerate() {
            let payload_hash = blake2b_256(fragment);
            let dependency_refs = policy.dependencies(index);

            let mut parts: Vec<&[u8]> = Vec::with_capacity(dependency_refs.len() + 2);
            let index_bytes = (index as u64).to_le_bytes();
            parts.push(&index_bytes);
            parts.push(&payload_hash);
            for &dep in &dependency_refs {
                parts.push(&nodes[dep].node_hash);
            }
            let node_hash = blake2b_256_multi(&parts);

            nodes.push(EntanglementNode {
                index,
                payload_hash,
                dependency_refs,
                node_hash,
            });
        }

        let root_hash = fold_root(&nodes);

        Ok(Self {
            nodes,
            policy,
            root_hash,
        })
    }

    /// Number of entangled fragments.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Fold all node hashes (and the node count) into the root hash.
fn fold_root(nodes: &[EntanglementNode]) -> [u8; 32] {
    let count_bytes = (nodes.len() as u64).to_le_bytes();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(nodes.len() + 1);
    parts.push(&count_bytes);
    for node in nodes {
        parts.push(&node.node_hash);
    }
    blake2b_256_multi(&parts)
}
