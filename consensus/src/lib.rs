//! Byzantine-tolerant agreement core.
//!
//! A value finalizes when `2f + 1` of `3f + 1` nodes produce matching
//! signed commit votes. Honest nodes (≥ `2f + 1`) converge on the same
//! value; Byzantine nodes' local views may diverge and are recorded as
//! observations, never treated as fatal.
//!
//! ## Module overview
//!
//! - [`round`] — per-proposal state machine (propose → prepare → commit,
//!   view changes on timeout).
//! - [`divergence`] — equivocation detection across votes.
//! - [`aggregator`] — per-content verdict aggregation with dispute capping
//!   and reputation-weighted trust scores.
//! - [`error`] — consensus error types.

pub mod aggregator;
pub mod divergence;
pub mod error;
pub mod round;

pub use aggregator::{ConsensusSummary, Verdict, VerdictAggregator, VerificationStatus};
pub use divergence::{DivergenceDetector, DivergenceObservation};
pub use error::ConsensusError;
pub use round::{ConsensusRound, RoundPhase, VoteOutcome};
