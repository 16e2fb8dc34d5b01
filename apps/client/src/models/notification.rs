use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SyncRecord;
use crate::store::Timestamped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MemoryShared,
    Medication,
    SafeZone,
    System,
}

/// An in-app notification addressed to one account. Local side effect only;
/// there is no push transport behind these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for Notification {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl SyncRecord for Notification {
    fn sync_id(&self) -> &str {
        &self.id
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
