//! Coordinate truncation and great-circle distance.

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Truncation granularity in degrees (~11 km of latitude).
const TRUNCATION_DEGREES: f64 = 0.1;

/// A geographic coordinate pair in decimal degrees.
///
/// Exact points are private registry state; only [`GeoPoint::truncate`]d
/// coordinates ever appear in serialized identities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Truncate both coordinates to ~10 km precision for public exposure.
    pub fn truncate(&self) -> Self {
        Self {
            latitude: (self.latitude / TRUNCATION_DEGREES).trunc() * TRUNCATION_DEGREES,
            longitude: (self.longitude / TRUNCATION_DEGREES).trunc() * TRUNCATION_DEGREES,
        }
    }

    /// Canonical byte encoding (little-endian lat ∥ lon) for commitments.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.latitude.to_le_bytes());
        out[8..].copy_from_slice(&self.longitude.to_le_bytes());
        out
    }
}

/// Great-circle distance between two points in kilometres (haversine).
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
