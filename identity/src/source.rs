//! Source identity — the serializable public view and the private registry record.

use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use veracity_types::{Commitment, CredentialLevel, PublicKey, SourceId, SourceState, Timestamp};

/// The public, serializable view of a registered source.
///
/// Coordinates are truncated to ~10 km before they reach this struct; the
/// exact location lives only in [`SourceRecord`], which has no serde
/// derives on purpose.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceIdentity {
    pub id: SourceId,
    pub public_key: PublicKey,
    pub credential_level: CredentialLevel,
    pub geolocation_commitment: Commitment,
    pub truncated_latitude: f64,
    pub truncated_longitude: f64,
    pub country: String,
    pub region: String,
    pub created_at: Timestamp,
    pub last_verified_at: Option<Timestamp>,
}

/// The in-memory registry record for a source.
///
/// Holds the exact location for deviation checks during challenge
/// completion. Intentionally not serializable.
pub struct SourceRecord {
    pub identity: SourceIdentity,
    pub exact_location: GeoPoint,
    pub state: SourceState,
}
