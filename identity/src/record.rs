//! Source-verification wire record.
//!
//! Layout: `[magic:4 = 01 02 03 04][commitment:32][sig_len:4 LE][signature]`.
//! The total length must exactly match; anything else is rejected.

use crate::error::IdentityError;
use veracity_types::{Commitment, Signature};

/// Magic bytes opening every record.
pub const RECORD_MAGIC: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

const HEADER_LEN: usize = 4 + Commitment::SIZE + 4;

/// A source's geolocation commitment plus the service signature over it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceVerificationRecord {
    pub commitment: Commitment,
    pub signature: Signature,
}

/// Serialize a record into the wire layout.
pub fn encode_record(record: &SourceVerificationRecord) -> Vec<u8> {
    let sig = record.signature.as_bytes();
    let mut out = Vec::with_capacity(HEADER_LEN + sig.len());
    out.extend_from_slice(&RECORD_MAGIC);
    out.extend_from_slice(record.commitment.as_bytes());
    out.extend_from_slice(&(sig.len() as u32).to_le_bytes());
    out.extend_from_slice(sig);
    out
}

/// Decode a record, failing fast on structural inconsistency.
pub fn decode_record(bytes: &[u8]) -> Result<SourceVerificationRecord, IdentityError> {
    if bytes.len() < HEADER_LEN {
        return Err(IdentityError::MalformedRecord(format!(
            "{} bytes is shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    if bytes[..4] != RECORD_MAGIC {
        return Err(IdentityError::MalformedRecord("bad magic".into()));
    }

    let commitment = Commitment::from_slice(&bytes[4..4 + Commitment::SIZE])
        .expect("fixed 32-byte slice");

    let sig_len_offset = 4 + Commitment::SIZE;
    let sig_len = u32::from_le_bytes(
        bytes[sig_len_offset..sig_len_offset + 4]
            .try_into()
            .expect("4 bytes"),
    ) as usize;

    let declared = HEADER_LEN
        .checked_add(sig_len)
        .ok_or_else(|| IdentityError::MalformedRecord("declared size overflows".into()))?;
    if bytes.len() != declared {
        return Err(IdentityError::MalformedRecord(format!(
            "total length {} does not match declared {declared}",
            bytes.len()
        )));
    }

    let sig_bytes: [u8; 64] = bytes[HEADER_LEN..]
        .try_into()
        .map_err(|_| IdentityError::MalformedRecord(format!("signature length {sig_len} != 64")))?;

    Ok(SourceVerificationRecord {
        commitment,
        signature: Signature(sig_bytes),
    })
}
