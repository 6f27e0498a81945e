//! Verification levels, source lifecycle states, and credential tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How strongly a piece of content has been verified.
///
/// Ordinals are total-ordered; `Minimal` is the floor any disputed result
/// is capped to, regardless of how many nodes voted higher.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum VerificationLevel {
    /// Lowest defined level; the cap applied to any disputed result.
    Minimal,
    Low,
    Medium,
    High,
    /// Every check passed with full cross-referencing.
    Full,
}

impl VerificationLevel {
    /// Numeric ordinal (Minimal = 0 … Full = 4).
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Minimal => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Full => 4,
        }
    }

    /// The highest defined ordinal.
    pub const MAX_ORDINAL: u8 = 4;

    /// Reconstruct a level from its ordinal; out-of-range values clamp to `Full`.
    pub fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => Self::Minimal,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Full,
        }
    }
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Full => "full",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of a registered source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceState {
    /// Registered but never challenged.
    Registered,
    /// A verification session is outstanding.
    ChallengeIssued,
    /// Challenge-response succeeded within the deviation bound.
    Verified,
    /// Verification lapsed past the recency window.
    Expired,
    /// Administratively revoked; terminal.
    Revoked,
}

/// Credential tier assigned to a source at registration.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CredentialLevel {
    /// Self-registered, no external vetting.
    Basic,
    /// Vetted individual journalist.
    Accredited,
    /// Vetted news organisation.
    Institutional,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_matches_ordinals() {
        assert!(VerificationLevel::Minimal < VerificationLevel::Low);
        assert!(VerificationLevel::High < VerificationLevel::Full);
        for o in 0..=VerificationLevel::MAX_ORDINAL {
            assert_eq!(VerificationLevel::from_ordinal(o).ordinal(), o);
        }
    }

    #[test]
    fn out_of_range_ordinal_clamps() {
        assert_eq!(VerificationLevel::from_ordinal(200), VerificationLevel::Full);
    }

    #[test]
    fn minimal_is_the_floor() {
        assert_eq!(VerificationLevel::from_ordinal(0), VerificationLevel::Minimal);
        assert_eq!(VerificationLevel::Minimal.ordinal(), 0);
    }
}
