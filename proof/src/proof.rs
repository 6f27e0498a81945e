//! Proof generation and probabilistic verification.
//!
//! Each proof embeds a fixed number of cut-and-choose rounds. The secret
//! digest `d` is split per round into two one-time-pad shares whose hashes
//! are both committed; the Fiat–Shamir challenge selects which share is
//! revealed. Revealing one share of a round discloses nothing about `d`.

use crate::error::ProofError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use veracity_crypto::{blake2b_256, blake2b_256_multi};
use veracity_types::Commitment;

/// Default cut-and-choose rounds per proof (soundness error ~2^-40 against
/// challenge grinding).
pub const PROOF_ROUNDS: u32 = 40;

/// Bytes per share.
const SHARE_LEN: usize = 32;
/// Bytes per round record: `[share0_hash][share1_hash][revealed_share]`.
const ROUND_LEN: usize = 3 * SHARE_LEN;

/// A self-contained zero-knowledge proof record.
///
/// Stateless after creation; verified against a
/// `(public_input, epsilon, sample_count)` tuple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Aggregate commitment over every round's share commitments.
    pub commitment: Commitment,
    /// Fiat–Shamir challenge: hash of commitment ∥ public input.
    pub challenge: [u8; 32],
    /// Concatenated round records.
    pub response: Vec<u8>,
}

impl Proof {
    /// Number of cut-and-choose rounds carried in the response.
    pub fn rounds(&self) -> usize {
        self.response.len() / ROUND_LEN
    }
}

/// Which share a round's challenge bit selects for reveal.
fn challenge_bit(challenge: &[u8; 32], round: usize) -> bool {
    let digest = blake2b_256_multi(&[challenge, &(round as u64).to_le_bytes()]);
    digest[0] & 1 == 1
}

/// Generate a proof of knowledge of `secret` bound to `public_input`,
/// using the default round count.
pub fn generate_proof(secret: &[u8], public_input: &[u8]) -> Result<Proof, ProofError> {
    generate_proof_with_rounds(secret, public_input, PROOF_ROUNDS)
}

/// Generate a proof with masks derived from a fixed seed (deterministic).
///
/// For test doubles only: the masks are reproducible, so proofs lose
/// their unlinkability. Production paths use [`generate_proof`].
pub fn generate_proof_seeded(
    secret: &[u8],
    public_input: &[u8],
    rounds: u32,
    seed: &[u8; 32],
) -> Result<Proof, ProofError> {
    generate_inner(secret, public_input, rounds, Some(seed))
}

/// Generate a proof with an explicit round count.
///
/// Costs are O(|secret| + |public_input| + rounds).
pub fn generate_proof_with_rounds(
    secret: &[u8],
    public_input: &[u8],
    rounds: u32,
) -> Result<Proof, ProofError> {
    generate_inner(secret, public_input, rounds, None)
}

fn generate_inner(
    secret: &[u8],
    public_input: &[u8],
    rounds: u32,
    seed: Option<&[u8; 32]>,
) -> Result<Proof, ProofError> {
    if secret.is_empty() {
        return Err(ProofError::InvalidInput("empty secret".into()));
    }
    if public_input.is_empty() {
        return Err(ProofError::InvalidInput("empty public input".into()));
    }
    if rounds == 0 {
        return Err(ProofError::InvalidInput("zero proof rounds".into()));
    }

    let secret_digest = blake2b_256(secret);
    let rounds = rounds as usize;

    let mut share_pairs: Vec<([u8; 32], [u8; 32])> = Vec::with_capacity(rounds);
    let mut pair_commitments: Vec<([u8; 32], [u8; 32])> = Vec::with_capacity(rounds);

    for round in 0..rounds {
        let mask = match seed {
            Some(seed) => blake2b_256_multi(&[seed, &(round as u64).to_le_bytes()]),
            None => {
                let mut drawn = [0u8; 32];
                getrandom::getrandom(&mut drawn).map_err(|_| ProofError::RngUnavailable)?;
                drawn
            }
        };

        let mut other = [0u8; 32];
        for (i, byte) in other.iter_mut().enumerate() {
            *byte = secret_digest[i] ^ mask[i];
        }

        pair_commitments.push((blake2b_256(&mask), blake2b_256(&other)));
        share_pairs.push((mask, other));
    }

    let mut agg_parts: Vec<&[u8]> = Vec::with_capacity(rounds * 2);
    for (c0, c1) in &pair_commitments {
        agg_parts.push(c0);
        agg_parts.push(c1);
    }
    let aggregate = blake2b_256_multi(&agg_parts);
    let challenge = blake2b_256_multi(&[&aggregate, public_input]);

    let mut response = Vec::with_capacity(rounds * ROUND_LEN);
    for (round, ((share0, share1), (c0, c1))) in
        share_pairs.iter().zip(pair_commitments.iter()).enumerate()
    {
        response.extend_from_slice(c0);
        response.extend_from_slice(c1);
        let revealed = if challenge_bit(&challenge, round) {
            share1
        } else {
            share0
        };
        response.extend_from_slice(revealed);
    }

    Ok(Proof {
        commitment: Commitment::new(aggregate),
        challenge,
        response,
    })
}

/// Verify a proof against `public_input`.
///
/// Runs `sample_count` probabilistic trials and accepts iff the number of
/// failing trials stays within `epsilon × sample_count`. The result never
/// reports which trials failed, and every trial runs even once the failure
/// budget is exceeded.
pub fn verify_proof(
    proof: &Proof,
    public_input: &[u8],
    epsilon: f64,
    sample_count: u32,
) -> Result<bool, ProofError> {
    verify_inner(proof, public_input, epsilon, sample_count, None)
}

/// Verify a proof with an explicit deadline.
///
/// Surfaces [`ProofError::Timeout`] once the deadline is exceeded;
/// partial trial results are discarded, never treated as acceptance.
pub fn verify_proof_with_deadline(
    proof: &Proof,
    public_input: &[u8],
    epsilon: f64,
    sample_count: u32,
    deadline: Duration,
) -> Result<bool, ProofError> {
    verify_inner(proof, public_input, epsilon, sample_count, Some(deadline))
}

fn verify_inner(
    proof: &Proof,
    public_input: &[u8],
    epsilon: f64,
    sample_count: u32,
    deadline: Option<Duration>,
) -> Result<bool, ProofError> {
    if public_input.is_empty() {
        return Err(ProofError::InvalidInput("empty public input".into()));
    }
    if !(0.0..1.0).contains(&epsilon) {
        return Err(ProofError::InvalidInput(format!(
            "epsilon {epsilon} outside [0, 1)"
        )));
    }
    if sample_count == 0 {
        return Err(ProofError::InvalidInput("zero sample count".into()));
    }

    // Structural checks run before any cryptographic work.
    if proof.response.is_empty() || proof.response.len() % ROUND_LEN != 0 {
        return Err(ProofError::MalformedProof(format!(
            "response length {} is not a positive multiple of {ROUND_LEN}",
            proof.response.len()
        )));
    }
    let rounds = proof.rounds();

    let started = Instant::now();

    // Binding check: the commitment must hash over exactly these round
    // commitments.
    let mut agg_parts: Vec<&[u8]> = Vec::with_capacity(rounds * 2);
    for round in 0..rounds {
        let record = &proof.response[round * ROUND_LEN..(round + 1) * ROUND_LEN];
        agg_parts.push(&record[..SHARE_LEN]);
        agg_parts.push(&record[SHARE_LEN..2 * SHARE_LEN]);
    }
    let aggregate = blake2b_256_multi(&agg_parts);
    if &aggregate != proof.commitment.as_bytes() {
        return Ok(false);
    }

    let challenge = blake2b_256_multi(&[&aggregate, public_input]);

    let allowed_failures = (epsilon * sample_count as f64).floor() as u32;
    let mut failures = 0u32;

    for trial in 0..sample_count {
        if let Some(limit) = deadline {
            if started.elapsed() > limit {
                return Err(ProofError::Timeout(limit));
            }
        }

        let round = trial as usize % rounds;
        let record = &proof.response[round * ROUND_LEN..(round + 1) * ROUND_LEN];
        let c0 = &record[..SHARE_LEN];
        let c1 = &record[SHARE_LEN..2 * SHARE_LEN];
        let revealed = &record[2 * SHARE_LEN..];

        let expected = if challenge_bit(&challenge, round) {
            c1
        } else {
            c0
        };
        if blake2b_256(revealed).as_slice() != expected {
            failures += 1;
        }
    }

    Ok(failures <= allowed_failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.05;
    const SAMPLES: u32 = 40;

    #[test]
    fn generated_proof_verifies() {
        let proof = generate_proof(b"source-identity-secret", b"article-context").unwrap();
        let ok = verify_proof(&proof, b"article-context", EPSILON, SAMPLES).unwrap();
        assert!(ok);
    }

    #[test]
    fn wrong_public_input_rejected() {
        let proof = generate_proof(b"source-identity-secret", b"article-context").unwrap();
        let ok = verify_proof(&proof, b"different-context", EPSILON, SAMPLES).unwrap();
        assert!(!ok);
    }

    #[test]
    fn proofs_are_unlinkable() {
        let p1 = generate_proof(b"same-secret", b"ctx").unwrap();
        let p2 = generate_proof(b"same-secret", b"ctx").unwrap();
        assert_ne!(p1.commitment, p2.commitment);
    }

    #[test]
    fn more_samples_than_rounds_cycles() {
        let proof = generate_proof_with_rounds(b"secret", b"ctx", 8).unwrap();
        assert!(verify_proof(&proof, b"ctx", EPSILON, 100).unwrap());
        assert!(!verify_proof(&proof, b"other", EPSILON, 100).unwrap());
    }

    #[test]
    fn tampered_response_rejected() {
        let mut proof = generate_proof(b"secret", b"ctx").unwrap();
        proof.response[10] ^= 0xFF;
        assert!(!verify_proof(&proof, b"ctx", EPSILON, SAMPLES).unwrap());
    }

    #[test]
    fn truncated_response_rejected() {
        let mut proof = generate_proof(b"secret", b"ctx").unwrap();
        proof.response.truncate(proof.response.len() - 96);
        // Still a whole number of rounds, but the aggregate no longer matches.
        assert!(!verify_proof(&proof, b"ctx", EPSILON, SAMPLES).unwrap());
    }

    #[test]
    fn ragged_response_is_malformed() {
        let mut proof = generate_proof(b"secret", b"ctx").unwrap();
        proof.response.pop();
        let result = verify_proof(&proof, b"ctx", EPSILON, SAMPLES);
        assert!(matches!(result, Err(ProofError::MalformedProof(_))));
    }

    #[test]
    fn empty_inputs_rejected() {
        assert!(matches!(
            generate_proof(b"", b"ctx"),
            Err(ProofError::InvalidInput(_))
        ));
        assert!(matches!(
            generate_proof(b"secret", b""),
            Err(ProofError::InvalidInput(_))
        ));

        let proof = generate_proof(b"secret", b"ctx").unwrap();
        assert!(matches!(
            verify_proof(&proof, b"", EPSILON, SAMPLES),
            Err(ProofError::InvalidInput(_))
        ));
        assert!(matches!(
            verify_proof(&proof, b"ctx", EPSILON, 0),
            Err(ProofError::InvalidInput(_))
        ));
        assert!(matches!(
            verify_proof(&proof, b"ctx", 1.5, SAMPLES),
            Err(ProofError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_deadline_times_out() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let result =
            verify_proof_with_deadline(&proof, b"ctx", EPSILON, SAMPLES, Duration::ZERO);
        assert!(matches!(result, Err(ProofError::Timeout(_))));
    }

    #[test]
    fn generous_deadline_succeeds() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let ok = verify_proof_with_deadline(
            &proof,
            b"ctx",
            EPSILON,
            SAMPLES,
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(ok);
    }
}
