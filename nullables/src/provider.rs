//! Nullable crypto provider — deterministic commitments and proofs.

use std::sync::Mutex;

use veracity_crypto::blake2b_256_multi;
use veracity_proof::{
    generate_proof_seeded, verify_proof, CryptoProvider, Encapsulation, Proof, ProofError,
    PROOF_ROUNDS,
};
use veracity_types::{Commitment, PrivateKey, PublicKey, Signature};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

/// A deterministic [`CryptoProvider`] for testing.
///
/// All randomness is derived from a fixed seed plus an internal call
/// counter, so sequences of operations replay identically while still
/// producing distinct values per call.
pub struct NullProvider {
    seed: [u8; 32],
    counter: Mutex<u64>,
}

impl NullProvider {
    /// Create a provider with a fixed seed.
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            counter: Mutex::new(0),
        }
    }

    fn next_nonce(&self) -> [u8; 32] {
        let mut counter = self.counter.lock().unwrap();
        let nonce = blake2b_256_multi(&[&self.seed, &counter.to_le_bytes()]);
        *counter += 1;
        nonce
    }
}

impl Default for NullProvider {
    fn default() -> Self {
        Self::new([0u8; 32])
    }
}

impl CryptoProvider for NullProvider {
    fn commit(&self, secret: &[u8], aux_public: &[u8]) -> Result<Commitment, ProofError> {
        if secret.is_empty() {
            return Err(ProofError::InvalidInput("empty secret".into()));
        }
        if aux_public.is_empty() {
            return Err(ProofError::InvalidInput("empty auxiliary input".into()));
        }
        let nonce = self.next_nonce();
        Ok(Commitment::new(blake2b_256_multi(&[
            secret, aux_public, &nonce,
        ])))
    }

    fn prove(&self, secret: &[u8], public_input: &[u8]) -> Result<Proof, ProofError> {
        let seed = self.next_nonce();
        generate_proof_seeded(secret, public_input, PROOF_ROUNDS, &seed)
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
        let ephemeral = StaticSecret::from(self.next_nonce());
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
