//! Blake2b hashing for content, proposals, and proof transcripts.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use veracity_types::{ContentHash, ProposalId};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash a content submission to produce its `ContentHash`.
pub fn hash_content(content: &[u8]) -> ContentHash {
    ContentHash::new(blake2b_256(content))
}

/// Hash a proposed consensus value to produce its `ProposalId`.
pub fn hash_proposal(value: &[u8]) -> ProposalId {
    ProposalId::new(blake2b_256(value))
}
