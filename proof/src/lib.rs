//! Probabilistic zero-knowledge commitments and proofs.
//!
//! The proof protocol is a hash-based cut-and-choose construction: the
//! prover splits its secret digest into one-time-pad shares per round,
//! commits to both shares, and reveals exactly one per round as selected
//! by a Fiat–Shamir challenge derived from the commitment and the public
//! input. A verifier replays the challenge and checks the revealed share
//! against its commitment across a configurable number of trials.
//!
//! ## Module overview
//!
//! - [`commitment`] — randomized commitments (unlinkable across calls).
//! - [`proof`] — proof generation and probabilistic verification.
//! - [`wire`] — the length-prefixed byte encoding consumed by external callers.
//! - [`provider`] — the swappable crypto capability set (real vs. test backends).
//! - [`error`] — proof-engine error types.

pub mod commitment;
pub mod error;
pub mod proof;
pub mod provider;
pub mod wire;

pub use commitment::create_commitment;
pub use error::ProofError;
pub use proof::{
    generate_proof, generate_proof_seeded, generate_proof_with_rounds, verify_proof,
    verify_proof_with_deadline, Proof, PROOF_ROUNDS,
};
pub use provider::{CryptoProvider, Encapsulation, StandardProvider};
pub use wire::{decode_proof, encode_proof};
