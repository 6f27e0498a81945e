//! Randomized commitments binding a secret plus auxiliary public context.

use crate::error::ProofError;
use veracity_crypto::blake2b_256_multi;
use veracity_types::Commitment;

/// Create a commitment to `secret` mixed with auxiliary public context.
///
/// A fresh 32-byte nonce is drawn from the operating system on every call,
/// so two commitments to the same logical secret are unlinkable. Returns
/// `InvalidInput` for empty inputs and `RngUnavailable` if the entropy
/// source fails.
pub fn create_commitment(secret: &[u8], aux_public: &[u8]) -> Result<Commitment, ProofError> {
    if secret.is_empty() {
        return Err(ProofError::InvalidInput("empty secret".into()));
    }
    if aux_public.is_empty() {
        return Err(ProofError::InvalidInput("empty auxiliary input".into()));
    }

    let mut nonce = [0u8; 32];
    getrandom::getrandom(&mut nonce).map_err(|_| ProofError::RngUnavailable)?;

    let digest = blake2b_256_multi(&[secret, aux_public, &nonce]);
    Ok(Commitment::new(digest))
}
