//! The source registry and its verification operations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info};

use crate::channel::SecureChannel;
use crate::credential::{AnonymousCredential, SignedCredential};
use crate::error::IdentityError;
use crate::geo::{haversine_km, GeoPoint};
use crate::record::SourceVerificationRecord;
use crate::session::ZkpSession;
use crate::source::{SourceIdentity, SourceRecord};

use veracity_crypto::{blake2b_256, generate_keypair};
use veracity_proof::CryptoProvider;
use veracity_types::{
    CredentialLevel, KeyPair, ProtocolParams, PublicKey, SessionId, Signature, SourceId,
    SourceState, Timestamp,
};

/// Counters reported by an expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub expired_sessions: usize,
    pub expired_channels: usize,
    pub expired_sources: usize,
}

/// Privacy-preserving source registry.
///
/// Sources hold their own signing keys; the service stores only public
/// keys and verifies challenge responses as signature proofs of
/// possession. Session, channel, and source maps are safe for concurrent
/// access from multiple request-handling contexts; a background sweep
/// (see [`spawn_sweeper`]) removes expired entries.
pub struct SourceService {
    provider: Arc<dyn CryptoProvider>,
    params: ProtocolParams,
    signing: KeyPair,
    sources: RwLock<HashMap<SourceId, SourceRecord>>,
    sessions: RwLock<HashMap<SessionId, ZkpSession>>,
    channels: RwLock<HashMap<SessionId, SecureChannel>>,
}

impl SourceService {
    /// Create a service with its own issuing keypair.
    pub fn new(provider: Arc<dyn CryptoProvider>, params: ProtocolParams) -> Self {
        Self {
            provider,
            params,
            signing: generate_keypair(),
            sources: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// The key credentials and verification records are signed with.
    pub fn service_public_key(&self) -> PublicKey {
        self.signing.public.clone()
    }

    /// Register a new source.
    ///
    /// Generates a keypair and hands it back to the caller — the service
    /// never stores the private half. The exact location stays in the
    /// in-memory record; the returned identity carries only truncated
    /// coordinates and a geolocation commitment.
    pub fn register(
        &self,
        credential_level: CredentialLevel,
        location: GeoPoint,
        country: &str,
        region: &str,
        now: Timestamp,
    ) -> Result<(SourceIdentity, KeyPair), IdentityError> {
        let keypair = generate_keypair();
        let id = SourceId::new(format!(
            "src_{}",
            hex::encode(&blake2b_256(keypair.public.as_bytes())[..8])
        ));

        let commitment = self
            .provider
            .commit(&location.to_bytes(), id.as_str().as_bytes())?;
        let truncated = location.truncate();

        let identity = SourceIdentity {
            id: id.clone(),
            public_key: keypair.public.clone(),
            credential_level,
            geolocation_commitment: commitment,
            truncated_latitude: truncated.latitude,
            truncated_longitude: truncated.longitude,
            country: country.to_string(),
            region: region.to_string(),
            created_at: now,
            last_verified_at: None,
        };

        self.sources.write().expect("sources lock").insert(
            id.clone(),
            SourceRecord {
                identity: identity.clone(),
                exact_location: location,
                state: SourceState::Registered,
            },
        );

        info!(source = %id, level = ?credential_level, "registered source");
        Ok((identity, keypair))
    }

    /// Issue a random challenge for a registered source.
    pub fn start_verification(
        &self,
        source_id: &SourceId,
        now: Timestamp,
    ) -> Result<ZkpSession, IdentityError> {
        let mut sources = self.sources.write().expect("sources lock");
        let record = sources
            .get_mut(source_id)
            .ok_or_else(|| IdentityError::SourceNotFound(source_id.to_string()))?;
        if record.state == SourceState::Revoked {
            return Err(IdentityError::SourceRevoked(source_id.to_string()));
        }

        let mut challenge = [0u8; 32];
        getrandom::getrandom(&mut challenge).map_err(|_| IdentityError::RngUnavailable)?;

        let session = ZkpSession {
            id: SessionId::new(format!("sess_{}", hex::encode(&challenge[..8]))),
            source_id: source_id.clone(),
            challenge,
            created_at: now,
            expires_at: now.plus_secs(self.params.session_ttl_secs),
        };

        record.state = SourceState::ChallengeIssued;
        self.sessions
            .write()
            .expect("sessions lock")
            .insert(session.id.clone(), session.clone());

        debug!(source = %source_id, session = %session.id, "issued verification challenge");
        Ok(session)
    }

    /// Check a challenge response and location claim.
    ///
    /// The response must be the source's signature over the session
    /// challenge, and the claimed location must lie within the configured
    /// deviation of the registered one. Any mismatch returns `Ok(false)` —
    /// failed verification is an expected outcome, not a fault.
    pub fn complete_verification(
        &self,
        session_id: &SessionId,
        response: &Signature,
        claimed_location: GeoPoint,
        now: Timestamp,
    ) -> Result<bool, IdentityError> {
        let session = {
            let mut sessions = self.sessions.write().expect("sessions lock");
            let session = sessions
                .get(session_id)
                .ok_or_else(|| IdentityError::SessionNotFound(session_id.to_string()))?;
            if session.is_expired(now) {
                sessions.remove(session_id);
                return Err(IdentityError::SessionExpired(session_id.to_string()));
            }
            session.clone()
        };

        let mut sources = self.sources.write().expect("sources lock");
        let record = sources
            .get_mut(&session.source_id)
            .ok_or_else(|| IdentityError::SourceNotFound(session.source_id.to_string()))?;

        let signature_ok =
            self.provider
                .verify_sig(&session.challenge, response, &record.identity.public_key);
        let distance_km = haversine_km(&claimed_location, &record.exact_location);
        let location_ok = distance_km <= self.params.max_deviation_km;

        if !(signature_ok && location_ok) {
            debug!(
                source = %session.source_id,
                signature_ok,
                distance_km,
                "verification attempt failed"
            );
            return Ok(false);
        }

        record.identity.last_verified_at = Some(now);
        record.state = SourceState::Verified;
        drop(sources);
        self.sessions.write().expect("sessions lock").remove(session_id);
        self.channels.write().expect("channels lock").remove(session_id);

        info!(source = %session.source_id, "source verified");
        Ok(true)
    }

    /// Issue an anonymous credential detached from any source identifier.
    ///
    /// Refuses unless the source verified within the recency window.
    pub fn issue_anonymous_credential(
        &self,
        source_id: &SourceId,
        now: Timestamp,
    ) -> Result<SignedCredential, IdentityError> {
        let sources = self.sources.read().expect("sources lock");
        let record = sources
            .get(source_id)
            .ok_or_else(|| IdentityError::SourceNotFound(source_id.to_string()))?;

        let last_verified = record
            .identity
            .last_verified_at
            .ok_or(IdentityError::NeverVerified)?;
        let elapsed = last_verified.elapsed_since(now);
        let limit = self.params.verification_recency_secs;
        if elapsed > limit {
            return Err(IdentityError::VerificationStale { elapsed, limit });
        }

        let mut nonce = [0u8; 32];
        getrandom::getrandom(&mut nonce).map_err(|_| IdentityError::RngUnavailable)?;

        let credential = AnonymousCredential {
            credential_level: record.identity.credential_level,
            issued_at: now,
            expires_at: now.plus_secs(self.params.credential_validity_secs),
            nonce,
        };
        let signature = self
            .provider
            .sign(&credential.signing_bytes()?, &self.signing.private);

        Ok(SignedCredential {
            credential,
            signature,
        })
    }

    /// Produce the wire record binding a source's geolocation commitment
    /// under the service signature.
    pub fn verification_record(
        &self,
        source_id: &SourceId,
    ) -> Result<SourceVerificationRecord, IdentityError> {
        let sources = self.sources.read().expect("sources lock");
        let record = sources
            .get(source_id)
            .ok_or_else(|| IdentityError::SourceNotFound(source_id.to_string()))?;

        let commitment = record.identity.geolocation_commitment;
        let signature = self
            .provider
            .sign(commitment.as_bytes(), &self.signing.private);
        Ok(SourceVerificationRecord {
            commitment,
            signature,
        })
    }

    /// Open a sealed channel bound to an active session.
    ///
    /// Returns the service-side public key the peer seals against.
    pub fn open_channel(
        &self,
        session_id: &SessionId,
        peer_public: [u8; 32],
        now: Timestamp,
    ) -> Result<[u8; 32], IdentityError> {
        {
            let sessions = self.sessions.read().expect("sessions lock");
            let session = sessions
                .get(session_id)
                .ok_or_else(|| IdentityError::SessionNotFound(session_id.to_string()))?;
            if session.is_expired(now) {
                return Err(IdentityError::SessionExpired(session_id.to_string()));
            }
        }

        let channel = SecureChannel::open(
            session_id.clone(),
            peer_public,
            now,
            self.params.session_ttl_secs,
        )?;
        let local_public = channel.local_public;
        self.channels
            .write()
            .expect("channels lock")
            .insert(session_id.clone(), channel);
        Ok(local_public)
    }

    /// Seal a payload on an open channel.
    pub fn seal_for_session(
        &self,
        session_id: &SessionId,
        plaintext: &[u8],
    ) -> Result<(u64, Vec<u8>), IdentityError> {
        let mut channels = self.channels.write().expect("channels lock");
        let channel = channels
            .get_mut(session_id)
            .ok_or_else(|| IdentityError::ChannelNotFound(session_id.to_string()))?;
        channel.seal_next(plaintext)
    }

    /// Open a payload the peer sealed on this session's channel (e.g. a
    /// challenge response travelling back to the service).
    pub fn open_for_session(
        &self,
        session_id: &SessionId,
        ciphertext: &[u8],
        counter: u64,
    ) -> Result<Vec<u8>, IdentityError> {
        let channels = self.channels.read().expect("channels lock");
        let channel = channels
            .get(session_id)
            .ok_or_else(|| IdentityError::ChannelNotFound(session_id.to_string()))?;
        channel.open_from_peer(ciphertext, counter)
    }

    /// Look up the public identity of a source.
    pub fn get_source(&self, source_id: &SourceId) -> Option<SourceIdentity> {
        self.sources
            .read()
            .expect("sources lock")
            .get(source_id)
            .map(|r| r.identity.clone())
    }

    /// Current lifecycle state of a source.
    pub fn source_state(&self, source_id: &SourceId) -> Option<SourceState> {
        self.sources
            .read()
            .expect("sources lock")
            .get(source_id)
            .map(|r| r.state)
    }

    /// Revoke a source. Terminal.
    pub fn revoke(&self, source_id: &SourceId) -> Result<(), IdentityError> {
        let mut sources = self.sources.write().expect("sources lock");
        let record = sources
            .get_mut(source_id)
            .ok_or_else(|| IdentityError::SourceNotFound(source_id.to_string()))?;
        record.state = SourceState::Revoked;
        info!(source = %source_id, "source revoked");
        Ok(())
    }

    /// Drop expired sessions and channels, and lapse stale verifications.
    pub fn sweep_expired(&self, now: Timestamp) -> SweepStats {
        let mut stats = SweepStats::default();

        {
            let mut sessions = self.sessions.write().expect("sessions lock");
            let before = sessions.len();
            sessions.retain(|_, session| !session.is_expired(now));
            stats.expired_sessions = before - sessions.len();
        }

        {
            let mut channels = self.channels.write().expect("channels lock");
            let before = channels.len();
            channels.retain(|_, channel| !channel.is_expired(now));
            stats.expired_channels = before - channels.len();
        }

        {
            let mut sources = self.sources.write().expect("sources lock");
            for record in sources.values_mut() {
                if record.state == SourceState::Verified {
                    let lapsed = record
                        .identity
                        .last_verified_at
                        .map(|t| t.has_expired(self.params.verification_recency_secs, now))
                        .unwrap_or(false);
                    if lapsed {
                        record.state = SourceState::Expired;
                        stats.expired_sources += 1;
                    }
                }
            }
        }

        if stats != SweepStats::default() {
            debug!(
                sessions = stats.expired_sessions,
                channels = stats.expired_channels,
                sources = stats.expired_sources,
                "swept expired identity state"
            );
        }
        stats
    }
}

/// Run [`SourceService::sweep_expired`] on a fixed interval.
///
/// The sweep never blocks concurrent readers for longer than one map pass.
pub fn spawn_sweeper(
    service: Arc<SourceService>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            service.sweep_expired(Timestamp::now());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veracity_crypto::sign_message;
    use veracity_proof::StandardProvider;

    fn service() -> SourceService {
        SourceService::new(Arc::new(StandardProvider), ProtocolParams::default())
    }

    fn berlin() -> GeoPoint {
        GeoPoint::new(52.5219, 13.4051)
    }

    fn register(service: &SourceService) -> (SourceIdentity, KeyPair) {
        service
            .register(
                CredentialLevel::Accredited,
                berlin(),
                "DE",
                "Berlin",
                Timestamp::new(1_000),
            )
            .unwrap()
    }

    #[test]
    fn register_exposes_only_truncated_location() {
        let service = service();
        let (identity, _kp) = register(&service);

        assert_ne!(identity.truncated_latitude, berlin().latitude);
        assert_ne!(identity.truncated_longitude, berlin().longitude);
        assert_eq!(
            service.source_state(&identity.id),
            Some(SourceState::Registered)
        );
    }

    #[test]
    fn full_verification_flow() {
        let service = service();
        let (identity, kp) = register(&service);

        let session = service
            .start_verification(&identity.id, Timestamp::new(2_000))
            .unwrap();
        assert_eq!(
            service.source_state(&identity.id),
            Some(SourceState::ChallengeIssued)
        );

        let response = sign_message(&session.challenge, &kp.private);
        // ~9 km north of the registered location.
        let claimed = GeoPoint::new(52.60, 13.4051);
        let ok = service
            .complete_verification(&session.id, &response, claimed, Timestamp::new(2_100))
            .unwrap();

        assert!(ok);
        assert_eq!(
            service.source_state(&identity.id),
            Some(SourceState::Verified)
        );
        let refreshed = service.get_source(&identity.id).unwrap();
        assert_eq!(refreshed.last_verified_at, Some(Timestamp::new(2_100)));
    }

    #[test]
    fn wrong_key_response_fails() {
        let service = service();
        let (identity, _kp) = register(&service);
        let session = service
            .start_verification(&identity.id, Timestamp::new(2_000))
            .unwrap();

        let other = generate_keypair();
        let response = sign_message(&session.challenge, &other.private);
        let ok = service
            .complete_verification(&session.id, &response, berlin(), Timestamp::new(2_100))
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn distant_location_fails() {
        let service = service();
        let (identity, kp) = register(&service);
        let session = service
            .start_verification(&identity.id, Timestamp::new(2_000))
            .unwrap();

        let response = sign_message(&session.challenge, &kp.private);
        // ~109 km north — far outside the 25 km bound.
        let distant = GeoPoint::new(53.5, 13.4051);
        let ok = service
            .complete_verification(&session.id, &response, distant, Timestamp::new(2_100))
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn expired_session_is_an_error() {
        let service = service();
        let (identity, kp) = register(&service);
        let session = service
            .start_verification(&identity.id, Timestamp::new(2_000))
            .unwrap();

        let response = sign_message(&session.challenge, &kp.private);
        let late = Timestamp::new(2_000 + 30 * 60);
        let result = service.complete_verification(&session.id, &response, berlin(), late);
        assert!(matches!(result, Err(IdentityError::SessionExpired(_))));
    }

    #[test]
    fn unknown_session_is_an_error() {
        let service = service();
        let result = service.complete_verification(
            &SessionId::new("sess_missing"),
            &Signature([0u8; 64]),
            berlin(),
            Timestamp::new(2_000),
        );
        assert!(matches!(result, Err(IdentityError::SessionNotFound(_))));
    }

    #[test]
    fn credential_requires_recent_verification() {
        let service = service();
        let (identity, kp) = register(&service);

        assert!(matches!(
            service.issue_anonymous_credential(&identity.id, Timestamp::new(2_000)),
            Err(IdentityError::NeverVerified)
        ));

        let session = service
            .start_verification(&identity.id, Timestamp::new(2_000))
            .unwrap();
        let response = sign_message(&session.challenge, &kp.private);
        assert!(service
            .complete_verification(&session.id, &response, berlin(), Timestamp::new(2_100))
            .unwrap());

        let signed = service
            .issue_anonymous_credential(&identity.id, Timestamp::new(3_000))
            .unwrap();
        assert_eq!(
            signed.credential.credential_level,
            CredentialLevel::Accredited
        );

        let stale = Timestamp::new(2_100 + 25 * 3600);
        assert!(matches!(
            service.issue_anonymous_credential(&identity.id, stale),
            Err(IdentityError::VerificationStale { .. })
        ));
    }

    #[test]
    fn issued_credential_verifies_against_service_key() {
        let service = service();
        let (identity, kp) = register(&service);
        let session = service
            .start_verification(&identity.id, Timestamp::new(2_000))
            .unwrap();
        let response = sign_message(&session.challenge, &kp.private);
        assert!(service
            .complete_verification(&session.id, &response, berlin(), Timestamp::new(2_100))
            .unwrap());

        let signed = service
            .issue_anonymous_credential(&identity.id, Timestamp::new(3_000))
            .unwrap();
        let ok = crate::credential::verify_credential(
            &signed,
            &service.service_public_key(),
            &StandardProvider,
            Timestamp::new(4_000),
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn verification_record_roundtrips() {
        let service = service();
        let (identity, _kp) = register(&service);

        let record = service.verification_record(&identity.id).unwrap();
        let bytes = crate::record::encode_record(&record);
        let decoded = crate::record::decode_record(&bytes).unwrap();
        assert_eq!(decoded, record);
        assert!(veracity_crypto::verify_signature(
            record.commitment.as_bytes(),
            &record.signature,
            &service.service_public_key()
        ));
    }

    #[test]
    fn revoked_source_cannot_start_verification() {
        let service = service();
        let (identity, _kp) = register(&service);
        service.revoke(&identity.id).unwrap();

        let result = service.start_verification(&identity.id, Timestamp::new(2_000));
        assert!(matches!(result, Err(IdentityError::SourceRevoked(_))));
    }

    #[test]
    fn sweep_drops_expired_sessions_and_lapses_sources() {
        let service = service();
        let (verified, kp) = register(&service);
        let (other, _) = register(&service);

        let session = service
            .start_verification(&verified.id, Timestamp::new(2_000))
            .unwrap();
        let response = sign_message(&session.challenge, &kp.private);
        assert!(service
            .complete_verification(&session.id, &response, berlin(), Timestamp::new(2_100))
            .unwrap());

        // A session on the other source left to expire.
        service
            .start_verification(&other.id, Timestamp::new(3_000))
            .unwrap();

        let later = Timestamp::new(3_000 + 31 * 60);
        let stats = service.sweep_expired(later);
        assert_eq!(stats.expired_sessions, 1);
        assert_eq!(stats.expired_sources, 0);

        let much_later = Timestamp::new(2_100 + 25 * 3600);
        let stats = service.sweep_expired(much_later);
        assert_eq!(stats.expired_sources, 1);
        assert_eq!(
            service.source_state(&verified.id),
            Some(SourceState::Expired)
        );
    }

    #[test]
    fn channel_lifecycle() {
        let service = service();
        let (identity, _kp) = register(&service);
        let session = service
            .start_verification(&identity.id, Timestamp::new(2_000))
            .unwrap();

        let peer_secret = [5u8; 32];
        let peer_public =
            x25519_dalek::PublicKey::from(&x25519_dalek::StaticSecret::from(peer_secret))
                .to_bytes();

        let service_public = service
            .open_channel(&session.id, peer_public, Timestamp::new(2_000))
            .unwrap();
        let (counter, sealed) = service
            .seal_for_session(&session.id, b"sealed challenge")
            .unwrap();

        let opened =
            veracity_crypto::open_sealed(&sealed, &service_public, &peer_secret, counter).unwrap();
        assert_eq!(opened, b"sealed challenge");

        // Peer replies over the same channel at its own counter; the
        // service opens it.
        let reply = veracity_crypto::seal(b"sealed response", &service_public, &peer_secret, 7)
            .unwrap();
        let opened = service.open_for_session(&session.id, &reply, 7).unwrap();
        assert_eq!(opened, b"sealed response");

        let garbled = service.open_for_session(&session.id, &reply, 8);
        assert!(matches!(garbled, Err(IdentityError::ChannelSeal)));
    }

    #[tokio::test]
    async fn background_sweeper_prunes_sessions() {
        let service = Arc::new(service());
        let (identity, _kp) = register(&service);
        // Session created far in the past relative to the wall clock the
        // sweeper uses, so the first sweep removes it.
        service
            .start_verification(&identity.id, Timestamp::new(0))
            .unwrap();

        let handle = spawn_sweeper(Arc::clone(&service), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        let sessions_left = service.sessions.read().unwrap().len();
        assert_eq!(sessions_left, 0);
    }
}
