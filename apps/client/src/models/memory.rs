use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SyncRecord;
use crate::store::Timestamped;

/// A point on the map with its human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub description: Option<String>,
}

/// A user-authored reminiscence record: photo, place, date, narrative.
///
/// `image` is either a remote URL or a data-URI-encoded compressed bitmap —
/// the store does not distinguish the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub location: GeoPoint,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Input for creating a memory; id and timestamps are assigned by the
/// repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraft {
    pub title: String,
    pub description: String,
    pub image: String,
    pub location: Option<GeoPoint>,
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

/// Partial update for a memory. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub location: Option<GeoPoint>,
    pub date: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
}

impl Timestamped for Memory {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl SyncRecord for Memory {
    fn sync_id(&self) -> &str {
        &self.id
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
