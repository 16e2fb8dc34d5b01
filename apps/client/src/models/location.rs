use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SyncRecord;
use crate::store::Timestamped;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const SAFE_ZONE_MIN_RADIUS_M: f64 = 100.0;
pub const SAFE_ZONE_MAX_RADIUS_M: f64 = 2000.0;

/// The last reported position of an account. One record per owner; a newer
/// report replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedLocation {
    pub owner_id: String,
    pub owner_name: String,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub recorded_at: DateTime<Utc>,
}

/// A caregiver-defined circular geofence around the senior's expected area.
/// Single current value; each save replaces the previous zone wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeZone {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: f64,
}

impl SafeZone {
    /// Builds a zone with the radius clamped to the supported range.
    pub fn new(lat: f64, lng: f64, radius_m: f64) -> Self {
        Self {
            lat,
            lng,
            radius_m: radius_m.clamp(SAFE_ZONE_MIN_RADIUS_M, SAFE_ZONE_MAX_RADIUS_M),
        }
    }

    /// Whether a position lies inside the zone, by great-circle distance.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        haversine_m(self.lat, self.lng, lat, lng) <= self.radius_m
    }
}

fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

impl Timestamped for SharedLocation {
    fn created_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl SyncRecord for SharedLocation {
    fn sync_id(&self) -> &str {
        &self.owner_id
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
