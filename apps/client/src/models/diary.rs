use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionCategory, EmotionScores};
use crate::models::SyncRecord;
use crate::store::Timestamped;

/// Who the entry is about: written by the senior themselves, or observed and
/// recorded by the guardian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    Senior,
    GuardianObserved,
}

/// A reflective text record with its attached sentiment.
///
/// Invariant: `dominant` is always the argmax of `scores` (ties broken by
/// category enumeration order). The repository recomputes it on every write
/// rather than trusting stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: String,
    pub date: NaiveDate,
    pub content: String,
    pub dominant: EmotionCategory,
    pub scores: EmotionScores,
    pub author: AuthorRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a diary entry; sentiment is attached separately from
/// the scoring step.
#[derive(Debug, Clone)]
pub struct DiaryDraft {
    pub date: NaiveDate,
    pub content: String,
    pub author: AuthorRole,
}

impl Timestamped for DiaryEntry {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl SyncRecord for DiaryEntry {
    fn sync_id(&self) -> &str {
        &self.id
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
