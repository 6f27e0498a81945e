//! Swappable crypto capability set.
//!
//! Nodes and the identity service take a [`CryptoProvider`] at construction
//! time, so proof and signature backends can be exchanged without runtime
//! type inspection. [`StandardProvider`] is the production backend; the
//! `veracity-nullables` crate ships a deterministic test double.
//!
//! Key encapsulation is expressed with fixed 32-byte outputs so the backend
//! can be swapped for a post-quantum KEM without touching call sites; the
//! standard backend uses X25519.

use crate::commitment::create_commitment;
use crate::error::ProofError;
use crate::proof::{generate_proof, verify_proof, Proof};
use rand::rngs::OsRng;
use veracity_types::{Commitment, PrivateKey, PublicKey, Signature};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, StaticSecret};

/// Result of a key encapsulation: the ciphertext travels to the peer, the
/// shared secret stays local.
pub struct Encapsulation {
    pub ciphertext: [u8; 32],
    pub shared_secret: [u8; 32],
}

/// The full crypto capability set used across the network.
pub trait CryptoProvider: Send + Sync {
    /// Randomized commitment to a secret with auxiliary public context.
    fn commit(&self, secret: &[u8], aux_public: &[u8]) -> Result<Commitment, ProofError>;

    /// Generate a zero-knowledge proof bound to `public_input`.
    fn prove(&self, secret: &[u8], public_input: &[u8]) -> Result<Proof, ProofError>;

    /// Probabilistically verify a proof.
    fn verify(
        &self,
        proof: &Proof,
        public_input: &[u8],
        epsilon: f64,
        sample_count: u32,
    ) -> Result<bool, ProofError>;

    /// Sign a message.
    fn sign(&self, message: &[u8], private_key: &PrivateKey) -> Signature;

    /// Verify a signature. `false` is an expected outcome, not a fault.
    fn verify_sig(&self, message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool;

    /// Encapsulate a fresh shared secret to the peer's key.
    fn encapsulate(&self, peer_public: &[u8; 32]) -> Result<Encapsulation, ProofError>;

    /// Recover the shared secret from an encapsulation ciphertext.
    fn decapsulate(
        &self,
        ciphertext: &[u8; 32],
        secret: &[u8; 32],
    ) -> Result<[u8; 32], ProofError>;
}

/// Production backend: Blake2b commitments, cut-and-choose proofs,
/// Ed25519 signatures, X25519 encapsulation.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardProvider;

impl CryptoProvider for StandardProvider {
    fn commit(&self, secret: &[u8], aux_public: &[u8]) -> Result<Commitment, ProofError> {
        create_commitment(secret, aux_public)
    }

    fn prove(&self, secret: &[u8], public_input: &[u8]) -> Result<Proof, ProofError> {
        generate_proof(secret, public_input)
    }

    fn verify(
        &self,
        proof: &Proof,
        public_input: &[u8],
        epsilon: f64,
        sample_count: u32,
    ) -> Result<bool, ProofError> {
        verify_proof(proof, public_input, epsilon, sample_count)
    }

    fn sign(&self, message: &[u8], private_key: &PrivateKey) -> Signature {
        veracity_crypto::sign_message(message, private_key)
    }

    fn verify_sig(&self, message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
        veracity_crypto::verify_signature(message, signature, public_key)
    }

    fn encapsulate(&self, peer_public: &[u8; 32]) -> Result<Encapsulation, ProofError> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ciphertext = X25519Public::from(&ephemeral).to_bytes();
        let shared = ephemeral.diffie_hellman(&X25519Public::from(*peer_public));
        Ok(Encapsulation {
            ciphertext,
            shared_secret: shared.to_bytes(),
        })
    }

    fn decapsulate(
        &self,
        ciphertext: &[u8; 32],
        secret: &[u8; 32],
    ) -> Result<[u8; 32], ProofError> {
        let static_secret = StaticSecret::from(*secret);
        let shared = static_secret.diffie_hellman(&X25519Public::from(*ciphertext));
        Ok(shared.to_bytes())
    }
}
