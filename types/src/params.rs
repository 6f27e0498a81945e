//! Protocol parameters shared by every node in the network.

use serde::{Deserialize, Serialize};

/// All tunable parameters stored by every node.
///
/// The fault-tolerance parameter `f` fixes the network size at `3f + 1`
/// and the finalization quorum at `2f + 1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Proof engine ─────────────────────────────────────────────────────
    /// Acceptable soundness error for probabilistic proof verification.
    pub epsilon: f64,

    /// Number of probabilistic verification trials per proof check.
    pub sample_count: u32,

    /// Cut-and-choose rounds embedded in each generated proof.
    pub proof_rounds: u32,

    // ── Identity / source service ────────────────────────────────────────
    /// Lifetime (seconds) of a verification session. Default: 30 minutes.
    pub session_ttl_secs: u64,

    /// Interval (seconds) between expiry sweeps. Defaults to the session TTL.
    pub sweep_interval_secs: u64,

    /// Maximum allowed distance (km) between a claimed location and the
    /// registered location during challenge completion.
    pub max_deviation_km: f64,

    /// How recently a source must have verified before a credential can be
    /// issued. Default: 24 hours.
    pub verification_recency_secs: u64,

    /// Validity window (seconds) of an anonymous credential. Default: 7 days.
    pub credential_validity_secs: u64,

    // ── Consensus ────────────────────────────────────────────────────────
    /// Byzantine fault tolerance `f`; the network runs `3f + 1` nodes and
    /// finalizes on `2f + 1` matching votes.
    pub fault_tolerance: u32,

    /// Seconds a round may sit without quorum before a view change.
    pub round_timeout_secs: u64,

    /// Maximum view changes before a proposal is abandoned.
    pub max_view_changes: u32,
}

impl ProtocolParams {
    /// Network defaults — the intended live configuration.
    pub fn network_defaults() -> Self {
        Self {
            epsilon: 0.05,
            sample_count: 40,
            proof_rounds: 40,

            session_ttl_secs: 30 * 60,
            sweep_interval_secs: 30 * 60,
            max_deviation_km: 25.0,
            verification_recency_secs: 24 * 3600,
            credential_validity_secs: 7 * 24 * 3600,

            fault_tolerance: 2,
            round_timeout_secs: 30,
            max_view_changes: 3,
        }
    }

    /// Total node count for the configured fault tolerance: `3f + 1`.
    pub fn network_size(&self) -> usize {
        3 * self.fault_tolerance as usize + 1
    }

    /// Matching votes required to finalize: `2f + 1`.
    pub fn quorum(&self) -> usize {
        2 * self.fault_tolerance as usize + 1
    }
}

/// Default is the live-network configuration.
impl Default for ProtocolParams {
    fn default() -> Self {
        Self::network_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_math() {
        let mut params = ProtocolParams::network_defaults();
        params.fault_tolerance = 2;
        assert_eq!(params.network_size(), 7);
        assert_eq!(params.quorum(), 5);

        params.fault_tolerance = 1;
        assert_eq!(params.network_size(), 4);
        assert_eq!(params.quorum(), 3);
    }

    #[test]
    fn sweep_interval_matches_session_ttl() {
        let params = ProtocolParams::default();
        assert_eq!(params.sweep_interval_secs, params.session_ttl_secs);
    }
}
