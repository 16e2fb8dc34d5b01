use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::SyncRecord;
use crate::store::Timestamped;

/// A scheduled medication reminder, shareable between paired accounts.
///
/// `time` is a wall-clock `HH:MM` string; "next dose" ordering compares these
/// strings lexicographically, which is correct for zero-padded 24h times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedMedication {
    pub id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub name: String,
    pub dosage: String,
    pub time: String,
    pub taken: bool,
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SharedMedication {
    /// Marks the dose taken. The transition is monotonic: once taken, a
    /// second call is a no-op and the original timestamp is kept.
    pub fn mark_taken(&mut self, now: DateTime<Utc>) {
        if self.taken {
            warn!("Medication {} already marked taken; ignoring", self.id);
            return;
        }
        self.taken = true;
        self.taken_at = Some(now);
        self.updated_at = now;
    }
}

/// Returns the next untaken dose at or after `now_hhmm`, wrapping to the
/// earliest untaken dose of the (next) day when none remain today.
pub fn next_dose<'a>(
    medications: &'a [SharedMedication],
    now_hhmm: &str,
) -> Option<&'a SharedMedication> {
    let untaken = medications.iter().filter(|m| !m.taken);
    let later_today = untaken
        .clone()
        .filter(|m| m.time.as_str() >= now_hhmm)
        .min_by(|a, b| a.time.cmp(&b.time));
    later_today.or_else(|| untaken.min_by(|a, b| a.time.cmp(&b.time)))
}

impl Timestamped for SharedMedication {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl SyncRecord for SharedMedication {
    fn sync_id(&self) -> &str {
        &self.id
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
