//! Cryptographic primitives for the Veracity network.
//!
//! Blake2b-256 hashing, Ed25519 signing, and X25519 + ChaCha20-Poly1305
//! channel sealing. Higher-level proof and commitment construction lives
//! in `veracity-proof`.

pub mod channel;
pub mod hash;
pub mod keys;
pub mod sign;

pub use channel::{open_sealed, seal, ChannelError};
pub use hash::{blake2b_256, blake2b_256_multi, hash_content, hash_proposal};
pub use keys::{generate_keypair, keypair_from_seed};
pub use sign::{sign_message, verify_signature};
