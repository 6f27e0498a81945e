//! Sealed channels for session payloads.
//!
//! Each channel pairs a fresh X25519 secret with the peer's public key and
//! seals payloads with a monotonically increasing counter (the AEAD nonce),
//! so key material is never reused across messages. Channels expire with
//! their session and are swept together.

use crate::error::IdentityError;
use veracity_types::{SessionId, Timestamp};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

/// Ephemeral sealed channel bound to a verification session.
pub struct SecureChannel {
    pub session_id: SessionId,
    local_secret: Zeroizing<[u8; 32]>,
    pub local_public: [u8; 32],
    pub peer_public: [u8; 32],
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    send_counter: u64,
}

impl SecureChannel {
    /// Open a channel with a freshly drawn local secret.
    pub fn open(
        session_id: SessionId,
        peer_public: [u8; 32],
        created_at: Timestamp,
        ttl_secs: u64,
    ) -> Result<Self, IdentityError> {
        let mut secret = Zeroizing::new([0u8; 32]);
        getrandom::getrandom(&mut *secret).map_err(|_| IdentityError::RngUnavailable)?;
        let local_public = X25519Public::from(&StaticSecret::from(*secret)).to_bytes();

        Ok(Self {
            session_id,
            local_secret: secret,
            local_public,
            peer_public,
            created_at,
            expires_at: created_at.plus_secs(ttl_secs),
            send_counter: 0,
        })
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Seal a payload for the peer, consuming the next counter value.
    ///
    /// Returns the counter alongside the ciphertext; the peer needs both.
    pub fn seal_next(&mut self, plaintext: &[u8]) -> Result<(u64, Vec<u8>), IdentityError> {
        let counter = self.send_counter;
        let sealed =
            veracity_crypto::seal(plaintext, &self.peer_public, &self.local_secret, counter)
                .map_err(|_| IdentityError::ChannelSeal)?;
        self.send_counter += 1;
        Ok((counter, sealed))
    }

    /// Open a payload sealed by the peer at the given counter.
    pub fn open_from_peer(
        &self,
        ciphertext: &[u8],
        counter: u64,
    ) -> Result<Vec<u8>, IdentityError> {
        veracity_crypto::open_sealed(ciphertext, &self.peer_public, &self.local_secret, counter)
            .map_err(|_| IdentityError::ChannelSeal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer_keys() -> ([u8; 32], [u8; 32]) {
        let secret = [9u8; 32];
        let public = X25519Public::from(&StaticSecret::from(secret)).to_bytes();
        (secret, public)
    }

    #[test]
    fn seal_counter_advances() {
        let (_, peer_public) = peer_keys();
        let mut channel = SecureChannel::open(
            SessionId::new("sess_1"),
            peer_public,
            Timestamp::new(1000),
            1800,
        )
        .unwrap();

        let (c0, _) = channel.seal_next(b"first").unwrap();
        let (c1, _) = channel.seal_next(b"second").unwrap();
        assert_eq!(c0, 0);
        assert_eq!(c1, 1);
    }

    #[test]
    fn peer_can_open_sealed_payload() {
        let (peer_secret, peer_public) = peer_keys();
        let mut channel = SecureChannel::open(
            SessionId::new("sess_1"),
            peer_public,
            Timestamp::new(1000),
            1800,
        )
        .unwrap();

        let (counter, sealed) = channel.seal_next(b"challenge payload").unwrap();
        let opened =
            veracity_crypto::open_sealed(&sealed, &channel.local_public, &peer_secret, counter)
                .unwrap();
        assert_eq!(opened, b"challenge payload");
    }

    #[test]
    fn peer_sealed_payload_opens() {
        let (peer_secret, peer_public) = peer_keys();
        let channel = SecureChannel::open(
            SessionId::new("sess_1"),
            peer_public,
            Timestamp::new(1_000),
            1800,
        )
        .unwrap();

        let sealed =
            veracity_crypto::seal(b"response payload", &channel.local_public, &peer_secret, 4)
                .unwrap();
        let opened = channel.open_from_peer(&sealed, 4).unwrap();
        assert_eq!(opened, b"response payload");

        assert!(channel.open_from_peer(&sealed, 5).is_err());
    }

    #[test]
    fn channel_expires_with_ttl() {
        let (_, peer_public) = peer_keys();
        let channel = SecureChannel::open(
            SessionId::new("sess_1"),
            peer_public,
            Timestamp::new(1000),
            1800,
        )
        .unwrap();
        assert!(!channel.is_expired(Timestamp::new(2799)));
        assert!(channel.is_expired(Timestamp::new(2800)));
    }
}
