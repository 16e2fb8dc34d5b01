pub mod diary;
pub mod location;
pub mod medication;
pub mod memory;
pub mod notification;
pub mod user;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Records the synchronizer can reconcile against a remote snapshot: a stable
/// string id plus a last-modified timestamp deciding which side wins.
pub trait SyncRecord {
    fn sync_id(&self) -> &str;
    fn modified_at(&self) -> DateTime<Utc>;
}

/// Generates a collision-resistant record id: creation-time millis plus a
/// random suffix. Ids are strings end to end, matching the wire format.
pub fn new_record_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &suffix[..8])
}
