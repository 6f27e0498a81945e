//! Time-boxed anonymous credentials.
//!
//! A credential attests to a credential level without carrying any source
//! identifier. It is signed by the service key and valid for a bounded
//! window; verifiers check the signature and the expiry, nothing else.

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use veracity_proof::CryptoProvider;
use veracity_types::{CredentialLevel, PublicKey, Signature, Timestamp};

/// The signed payload: level, validity window, and a random nonce so two
/// credentials for the same level are unlinkable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnonymousCredential {
    pub credential_level: CredentialLevel,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub nonce: [u8; 32],
}

impl AnonymousCredential {
    pub fn signing_bytes(&self) -> Result<Vec<u8>, IdentityError> {
        bincode::serialize(self).map_err(|e| IdentityError::Serialization(e.to_string()))
    }
}

/// A credential plus the issuing service's signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedCredential {
    pub credential: AnonymousCredential,
    pub signature: Signature,
}

/// Check a credential against the issuing service's public key.
///
/// Returns `false` for an expired or mis-signed credential — an expected
/// outcome, not an error.
pub fn verify_credential(
    signed: &SignedCredential,
    issuer: &PublicKey,
    provider: &dyn CryptoProvider,
    now: Timestamp,
) -> Result<bool, IdentityError> {
    if now >= signed.credential.expires_at {
        return Ok(false);
    }
    let bytes = signed.credential.signing_bytes()?;
    Ok(provider.verify_sig(&bytes, &signed.signature, issuer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use veracity_crypto::generate_keypair;
    use veracity_proof::StandardProvider;

    fn issue(now: u64, validity: u64) -> (SignedCredential, PublicKey) {
        let provider = StandardProvider;
        let kp = generate_keypair();
        let credential = AnonymousCredential {
            credential_level: CredentialLevel::Accredited,
            issued_at: Timestamp::new(now),
            expires_at: Timestamp::new(now + validity),
            nonce: [7u8; 32],
        };
        let bytes = credential.signing_bytes().unwrap();
        let signature = provider.sign(&bytes, &kp.private);
        (
            SignedCredential {
                credential,
                signature,
            },
            kp.public,
        )
    }

    #[test]
    fn valid_credential_verifies() {
        let (signed, issuer) = issue(1000, 3600);
        let ok =
            verify_credential(&signed, &issuer, &StandardProvider, Timestamp::new(2000)).unwrap();
        assert!(ok);
    }

    #[test]
    fn expired_credential_rejected() {
        let (signed, issuer) = issue(1000, 3600);
        let ok =
            verify_credential(&signed, &issuer, &StandardProvider, Timestamp::new(4600)).unwrap();
        assert!(!ok);
    }

    #[test]
    fn tampered_level_rejected() {
        let (mut signed, issuer) = issue(1000, 3600);
        signed.credential.credential_level = CredentialLevel::Institutional;
        let ok =
            verify_credential(&signed, &issuer, &StandardProvider, Timestamp::new(2000)).unwrap();
        assert!(!ok);
    }

    #[test]
    fn wrong_issuer_rejected() {
        let (signed, _issuer) = issue(1000, 3600);
        let other = generate_keypair();
        let ok = verify_credential(
            &signed,
            &other.public,
            &StandardProvider,
            Timestamp::new(2000),
        )
        .unwrap();
        assert!(!ok);
    }
}
