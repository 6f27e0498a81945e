//! Byte-level proof encoding consumed by external callers.
//!
//! Layout: `[commit_size:4][challenge_size:4][response_size:4]` followed by
//! the three sections, all integers little-endian. The total length must
//! exactly match the header-declared sizes; anything else is rejected
//! before cryptographic checks run.

use crate::error::ProofError;
use crate::proof::Proof;
use veracity_types::Commitment;

const HEADER_LEN: usize = 12;

/// Serialize a proof into the self-describing wire layout.
pub fn encode_proof(proof: &Proof) -> Vec<u8> {
    let commit = proof.commitment.as_bytes();
    let mut out = Vec::with_capacity(HEADER_LEN + commit.len() + 32 + proof.response.len());

    out.extend_from_slice(&(commit.len() as u32).to_le_bytes());
    out.extend_from_slice(&(proof.challenge.len() as u32).to_le_bytes());
    out.extend_from_slice(&(proof.response.len() as u32).to_le_bytes());
    out.extend_from_slice(commit);
    out.extend_from_slice(&proof.challenge);
    out.extend_from_slice(&proof.response);
    out
}

/// Decode a proof from the wire layout.
///
/// Fails fast on any structural inconsistency; no cryptographic work is
/// performed on malformed input.
pub fn decode_proof(bytes: &[u8]) -> Result<Proof, ProofError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProofError::MalformedProof(format!(
            "{} bytes is shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }

    let commit_size = u32::from_le_bytes(bytes[0..4].try_into().expect("4 bytes")) as usize;
    let challenge_size = u32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes")) as usize;
    let response_size = u32::from_le_bytes(bytes[8..12].try_into().expect("4 bytes")) as usize;

    if commit_size != Commitment::SIZE {
        return Err(ProofError::MalformedProof(format!(
            "commitment size {commit_size} != {}",
            Commitment::SIZE
        )));
    }
    if challenge_size != 32 {
        return Err(ProofError::MalformedProof(format!(
            "challenge size {challenge_size} != 32"
        )));
    }

    let declared = HEADER_LEN
        .checked_add(commit_size)
        .and_then(|n| n.checked_add(challenge_size))
        .and_then(|n| n.checked_add(response_size))
        .ok_or_else(|| ProofError::MalformedProof("declared sizes overflow".into()))?;
    if bytes.len() != declared {
        return Err(ProofError::MalformedProof(format!(
            "total length {} does not match declared {declared}",
            bytes.len()
        )));
    }

    let commit_end = HEADER_LEN + commit_size;
    let challenge_end = commit_end + challenge_size;

    let commitment =
        Commitment::from_slice(&bytes[HEADER_LEN..commit_end]).expect("size checked above");
    let mut challenge = [0u8; 32];
    challenge.copy_from_slice(&bytes[commit_end..challenge_end]);

    Ok(Proof {
        commitment,
        challenge,
        response: bytes[challenge_end..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::generate_proof;

    #[test]
    fn encode_decode_roundtrip() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let bytes = encode_proof(&proof);
        let decoded = decode_proof(&bytes).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn header_layout_is_little_endian() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let bytes = encode_proof(&proof);
        assert_eq!(&bytes[0..4], &32u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &32u32.to_le_bytes());
        assert_eq!(
            u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize,
            proof.response.len()
        );
    }

    #[test]
    fn short_buffer_rejected() {
        assert!(matches!(
            decode_proof(&[0u8; 11]),
            Err(ProofError::MalformedProof(_))
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let mut bytes = encode_proof(&proof);
        bytes.push(0);
        assert!(matches!(
            decode_proof(&bytes),
            Err(ProofError::MalformedProof(_))
        ));
    }

    #[test]
    fn truncated_body_rejected() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let mut bytes = encode_proof(&proof);
        bytes.pop();
        assert!(matches!(
            decode_proof(&bytes),
            Err(ProofError::MalformedProof(_))
        ));
    }

    #[test]
    fn wrong_commit_size_rejected() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let mut bytes = encode_proof(&proof);
        bytes[0..4].copy_from_slice(&31u32.to_le_bytes());
        assert!(matches!(
            decode_proof(&bytes),
            Err(ProofError::MalformedProof(_))
        ));
    }

    #[test]
    fn inflated_response_size_rejected() {
        let proof = generate_proof(b"secret", b"ctx").unwrap();
        let mut bytes = encode_proof(&proof);
        let inflated = (proof.response.len() as u32 + 1).to_le_bytes();
        bytes[8..12].copy_from_slice(&inflated);
        assert!(matches!(
            decode_proof(&bytes),
            Err(ProofError::MalformedProof(_))
        ));
    }
}
