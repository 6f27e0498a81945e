//! Sealed-channel encryption for session payloads.
//!
//! Uses X25519 Diffie-Hellman for key agreement, then ChaCha20-Poly1305
//! AEAD for authenticated encryption. Each channel message carries a
//! caller-supplied monotonically increasing counter that forms the nonce,
//! so a (key, nonce) pair is never reused within a channel's lifetime.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

/// Channel sealing/opening failures.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("sealing failed")]
    Seal,

    #[error("opening failed: authentication check failed")]
    Open,
}

fn symmetric_key(shared: &[u8; 32]) -> [u8; 32] {
    crate::hash::blake2b_256_multi(&[shared, b"veracity-channel"])
}

fn counter_nonce(counter: u64) -> Nonce {
    let mut nonce_bytes = [0u8; 12];
    nonce_bytes[..8].copy_from_slice(&counter.to_le_bytes());
    Nonce::from(nonce_bytes)
}

/// Seal a payload for the recipient.
///
/// `counter` must be unique per (sender, recipient) channel; both sides
/// track it. Returns ciphertext with a 16-byte Poly1305 tag appended.
pub fn seal(
    plaintext: &[u8],
    recipient_x25519_public: &[u8; 32],
    sender_x25519_secret: &[u8; 32],
    counter: u64,
) -> Result<Vec<u8>, ChannelError> {
    let secret = StaticSecret::from(*sender_x25519_secret);
    let recipient_pub = X25519Public::from(*recipient_x25519_public);
    let shared = secret.diffie_hellman(&recipient_pub);

    let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key(shared.as_bytes()))
        .expect("valid key length");

    cipher
        .encrypt(&counter_nonce(counter), plaintext)
        .map_err(|_| ChannelError::Seal)
}

/// Open a sealed payload from the sender.
///
/// The same `counter` used at sealing time must be supplied.
pub fn open_sealed(
    ciphertext: &[u8],
    sender_x25519_public: &[u8; 32],
    recipient_x25519_secret: &[u8; 32],
    counter: u64,
) -> Result<Vec<u8>, ChannelError> {
    let secret = StaticSecret::from(*recipient_x25519_secret);
    let sender_pub = X25519Public::from(*sender_x25519_public);
    let shared = secret.diffie_hellman(&sender_pub);

    let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key(shared.as_bytes()))
        .expect("valid key length");

    cipher
        .decrypt(&counter_nonce(counter), ciphertext)
        .map_err(|_| ChannelError::Open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let sender_secret = [1u8; 32];
        let recipient_secret = [2u8; 32];
        let sender_pub = X25519Public::from(&StaticSecret::from(sender_secret));
        let recipient_pub = X25519Public::from(&StaticSecret::from(recipient_secret));

        let payload = b"session challenge payload";
        let sealed = seal(payload, recipient_pub.as_bytes(), &sender_secret, 0).unwrap();

        // plaintext + 16-byte Poly1305 tag
        assert_eq!(sealed.len(), payload.len() + 16);

        let opened =
            open_sealed(&sealed, sender_pub.as_bytes(), &recipient_secret, 0).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn wrong_counter_fails_authentication() {
        let sender_secret = [1u8; 32];
        let recipient_secret = [2u8; 32];
        let sender_pub = X25519Public::from(&StaticSecret::from(sender_secret));
        let recipient_pub = X25519Public::from(&StaticSecret::from(recipient_secret));

        let sealed = seal(b"payload", recipient_pub.as_bytes(), &sender_secret, 3).unwrap();
        let result = open_sealed(&sealed, sender_pub.as_bytes(), &recipient_secret, 4);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sender_secret = [1u8; 32];
        let recipient_secret = [2u8; 32];
        let wrong_secret = [3u8; 32];
        let sender_pub = X25519Public::from(&StaticSecret::from(sender_secret));
        let recipient_pub = X25519Public::from(&StaticSecret::from(recipient_secret));

        let sealed = seal(b"payload", recipient_pub.as_bytes(), &sender_secret, 0).unwrap();
        let result = open_sealed(&sealed, sender_pub.as_bytes(), &wrong_secret, 0);
        assert!(result.is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let sender_secret = [1u8; 32];
        let recipient_secret = [2u8; 32];
        let sender_pub = X25519Public::from(&StaticSecret::from(sender_secret));
        let recipient_pub = X25519Public::from(&StaticSecret::from(recipient_secret));

        let mut sealed = seal(b"payload", recipient_pub.as_bytes(), &sender_secret, 0).unwrap();
        sealed[0] ^= 0xFF;

        let result = open_sealed(&sealed, sender_pub.as_bytes(), &recipient_secret, 0);
        assert!(result.is_err());
    }
}
