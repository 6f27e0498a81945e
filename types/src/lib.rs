//! Fundamental types for the Veracity verification network.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: content hashes, commitments, identifiers, key material,
//! timestamps, verification levels, and protocol parameters.

pub mod error;
pub mod hash;
pub mod id;
pub mod keys;
pub mod level;
pub mod params;
pub mod time;

pub use error::VeracityError;
pub use hash::{Commitment, ContentHash, ProposalId};
pub use id::{NodeId, SessionId, SourceId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use level::{CredentialLevel, SourceState, VerificationLevel};
pub use params::ProtocolParams;
pub use time::Timestamp;
