//! Per-content verdict aggregation.
//!
//! Verdicts accumulate idempotently per `(node, content hash)` — a
//! resubmission overwrites the node's prior verdict, never duplicates it.
//! The aggregated level is the maximum among non-disputing nodes unless
//! any node disputes, in which case the level is capped at the lowest
//! defined ordinal and all dispute reasons are unioned.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use veracity_types::{ContentHash, NodeId, Timestamp, VerificationLevel};

/// One node's verdict on one piece of content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Verdict {
    pub node_id: NodeId,
    pub level: VerificationLevel,
    pub cross_references: Vec<ContentHash>,
    pub disputed: bool,
    pub dispute_reasons: Vec<String>,
    pub submitted_at: Timestamp,
}

/// Consensus metadata reported alongside a verification status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusSummary {
    pub reached: bool,
    pub participating_nodes: usize,
    pub byzantine_detected: bool,
}

/// The aggregated verification state for one content hash.
///
/// This is the shape external status queries consume.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub content_hash: ContentHash,
    pub verification_level: VerificationLevel,
    pub verified_by: Vec<NodeId>,
    pub disputed: bool,
    pub dispute_reasons: Vec<String>,
    pub consensus: ConsensusSummary,
}

/// Aggregates verdicts per content hash.
///
/// Aggregation state is serialized per hash only — submissions for
/// different hashes are commutative and independent.
pub struct VerdictAggregator {
    /// Matching verdicts needed before consensus counts as reached.
    min_participants: usize,
    /// Per-content verdicts, one per node (BTreeMap keeps reports ordered).
    entries: HashMap<ContentHash, BTreeMap<NodeId, Verdict>>,
    /// Nodes observed equivocating; surfaces as `byzantine_detected`.
    flagged: HashSet<NodeId>,
}

impl VerdictAggregator {
    pub fn new(min_participants: usize) -> Self {
        Self {
            min_participants,
            entries: HashMap::new(),
            flagged: HashSet::new(),
        }
    }

    /// Record (or overwrite) one node's verdict for a content hash.
    pub fn submit(&mut self, content_hash: ContentHash, verdict: Verdict) {
        debug!(
            content = %content_hash,
            node = %verdict.node_id,
            level = %verdict.level,
            disputed = verdict.disputed,
            "verdict submitted"
        );
        self.entries
            .entry(content_hash)
            .or_default()
            .insert(verdict.node_id.clone(), verdict);
    }

    /// Mark a node as observed diverging.
    pub fn flag_byzantine(&mut self, node: &NodeId) {
        self.flagged.insert(node.clone());
    }

    /// Number of verdicts recorded for a hash.
    pub fn participant_count(&self, content_hash: &ContentHash) -> usize {
        self.entries.get(content_hash).map_or(0, |v| v.len())
    }

    /// Whether enough verdicts arrived for consensus to count as reached.
    pub fn is_content_verified(&self, content_hash: &ContentHash) -> bool {
        self.participant_count(content_hash) >= self.min_participants
    }

    /// The aggregated status for a hash, if any verdict was submitted.
    pub fn status(&self, content_hash: &ContentHash) -> Option<VerificationStatus> {
        let verdicts = self.entries.get(content_hash)?;

        let disputed = verdicts.values().any(|v| v.disputed);
        let verification_level = if disputed {
            VerificationLevel::Minimal
        } else {
            verdicts
                .values()
                .map(|v| v.level)
                .max()
                .unwrap_or(VerificationLevel::Minimal)
        };

        let mut dispute_reasons: Vec<String> = Vec::new();
        for verdict in verdicts.values().filter(|v| v.disputed) {
            for reason in &verdict.dispute_reasons {
                if !dispute_reasons.contains(reason) {
                    dispute_reasons.push(reason.clone());
                }
            }
        }

        let verified_by: Vec<NodeId> = verdicts.keys().cloned().collect();
        let byzantine_detected = !self.flagged.is_empty();

        Some(VerificationStatus {
            content_hash: *content_hash,
            verification_level,
            disputed,
            dispute_reasons,
            consensus: ConsensusSummary {
                reached: verified_by.len() >= self.min_participants,
                participating_nodes: verified_by.len(),
                byzantine_detected,
            },
            verified_by,
        })
    }

    /// Reputation-weighted trust score in [0, 1] for a hash.
    ///
    /// The weighted mean of level ordinals across `verified_by`, weighted
    /// by each node's reputation. Zero when nothing was submitted.
    pub fn trust_score(
        &self,
        content_hash: &ContentHash,
        reputations: &HashMap<NodeId, f64>,
    ) -> f64 {
        let Some(verdicts) = self.entries.get(content_hash) else {
            return 0.0;
        };

        let max_ordinal = f64::from(VerificationLevel::MAX_ORDINAL);
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for verdict in verdicts.values() {
            let reputation = reputations.get(&verdict.node_id).copied().unwrap_or(0.0);
            weighted += reputation * f64::from(verdict.level.ordinal()) / max_ordinal;
            total_weight += reputation;
        }

        if total_weight == 0.0 {
            0.0
        } else {
            weighted / total_weight
        }
    }
}
