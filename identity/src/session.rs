//! Ephemeral verification sessions.

use veracity_types::{SessionId, SourceId, Timestamp};

/// An outstanding challenge-response session.
///
/// The challenge is random; the expected response is an Ed25519 signature
/// over it by the source's client-held key. Sessions are owned exclusively
/// by the [`crate::SourceService`] until expiry or completion.
#[derive(Clone, Debug)]
pub struct ZkpSession {
    pub id: SessionId,
    pub source_id: SourceId,
    pub challenge: [u8; 32],
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl ZkpSession {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}
