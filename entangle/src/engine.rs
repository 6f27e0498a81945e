//! Integrity verification against a previously issued entanglement graph.

use crate::error::EntangleError;
use crate::graph::{DependencyPolicy, EntanglementGraph};
use serde::{Deserialize, Serialize};

/// Outcome of an integrity check over a candidate fragment set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Whether the fragment set matches the issued graph exactly.
    pub intact: bool,
    /// Indices whose recomputed node hash differs from the issued one.
    /// On an arity mismatch every expected index is reported — a missing
    /// fragment is never silently truncated away.
    pub tampered_sections: Vec<usize>,
}

impl IntegrityReport {
    fn intact() -> Self {
        Self {
            intact: true,
            tampered_sections: Vec::new(),
        }
    }
}

/// Verifies candidate fragment sets against issued graphs.
pub struct EntanglementEngine;

impl EntanglementEngine {
    /// Build a graph over `fragments` under `policy`.
    pub fn build(
        &self,
        fragments: &[Vec<u8>],
        policy: DependencyPolicy,
    ) -> Result<EntanglementGraph, EntangleError> {
        EntanglementGraph::build(fragments, policy)
    }

    /// Check a candidate fragment set against the issued graph.
    ///
    /// Rebuilds the graph from `fragments` under the issued policy and
    /// compares per-node hashes, distinguishing changed fragments (their
    /// indices are reported) from a missing or extra fragment (arity
    /// mismatch — all expected indices are reported).
    pub fn verify(
        &self,
        issued: &EntanglementGraph,
        fragments: &[Vec<u8>],
    ) -> Result<IntegrityReport, EntangleError> {
        if issued.is_empty() {
            return Err(EntangleError::MalformedEntanglement(
                "issued graph has no nodes".into(),
            ));
        }

        if fragments.len() != issued.len() {
            return Ok(IntegrityReport {
                intact: false,
                tampered_sections: (0..issued.len()).collect(),
            });
        }

        let rebuilt = EntanglementGraph::build(fragments, issued.policy)?;

        let tampered: Vec<usize> = issued
            .nodes
            .iter()
            .zip(rebuilt.nodes.iter())
            .filter(|(a, b)| a.node_hash != b.node_hash)
            .map(|(a, _)| a.index)
            .collect();

        if tampered.is_empty() && rebuilt.root_hash == issued.root_hash {
            Ok(IntegrityReport::intact())
        } else {
            Ok(IntegrityReport {
                intact: false,
                tampered_sections: tampered,
            })
        }
    }

    /// Check a candidate fragment set against a published root hash alone.
    ///
    /// For callers that hold only the 32-byte root; cannot localize which
    /// fragment changed.
    pub fn verify_root(
        &self,
        fragments: &[Vec<u8>],
        policy: DependencyPolicy,
        root_hash: &[u8; 32],
    ) -> Result<bool, EntangleError> {
        let rebuilt = EntanglementGraph::build(fragments, policy)?;
        Ok(&rebuilt.root_hash == root_hash)
    }
}
