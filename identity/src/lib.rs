//! Identity/Source service.
//!
//! Registers anonymity-preserving news sources, runs challenge-response
//! verification sessions (client-held-key proof of possession), issues
//! time-boxed anonymous credentials, and maintains sealed channels for
//! session payloads. Exact source coordinates never leave process memory;
//! the public identity carries only truncated coordinates plus a
//! geolocation commitment.
//!
//! ## Module overview
//!
//! - [`service`] — the [`SourceService`] registry and its operations.
//! - [`source`] — public identity vs. in-memory registry record.
//! - [`session`] — ephemeral verification sessions.
//! - [`credential`] — anonymous credential issuance and checking.
//! - [`channel`] — sealed channels with per-message counters.
//! - [`geo`] — coordinate truncation and haversine distance.
//! - [`record`] — the source-verification wire record.
//! - [`error`] — identity error types.

pub mod channel;
pub mod credential;
pub mod error;
pub mod geo;
pub mod record;
pub mod service;
pub mod session;
pub mod source;

pub use channel::SecureChannel;
pub use credential::{verify_credential, AnonymousCredential, SignedCredential};
pub use error::IdentityError;
pub use geo::{haversine_km, GeoPoint};
pub use record::{decode_record, encode_record, SourceVerificationRecord};
pub use service::{spawn_sweeper, SourceService, SweepStats};
pub use session::ZkpSession;
pub use source::{SourceIdentity, SourceRecord};
