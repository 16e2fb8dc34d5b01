//! Diary repository — write-through CRUD over persisted diary entries.
//!
//! Entry creation is two-phase at the screen level: the scorer runs on the
//! composed text first, and only an explicit `add` with the resulting report
//! persists anything. The stored dominant emotion is always recomputed from
//! the score vector, never taken on trust.

use chrono::Utc;
use tracing::{info, warn};

use crate::emotion::EmotionReport;
use crate::errors::AppError;
use crate::models::diary::{DiaryDraft, DiaryEntry};
use crate::models::new_record_id;
use crate::store::{keys, StoreAdapter};

pub struct DiaryRepository {
    store: StoreAdapter,
    items: Vec<DiaryEntry>,
}

impl DiaryRepository {
    pub fn load(store: StoreAdapter) -> Self {
        let mut repository = Self {
            store,
            items: Vec::new(),
        };
        repository.reload();
        repository
    }

    /// All entries, newest first.
    pub fn all(&self) -> &[DiaryEntry] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&DiaryEntry> {
        self.items.iter().find(|e| e.id == id)
    }

    pub fn reload(&mut self) {
        let mut items: Vec<DiaryEntry> = self.store.read_or(keys::DIARY_ENTRIES, Vec::new());
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.items = items;
    }

    /// Persists a composed entry with its confirmed sentiment.
    pub fn add(&mut self, draft: DiaryDraft, report: &EmotionReport) -> Result<&DiaryEntry, AppError> {
        if draft.content.trim().is_empty() {
            warn!("Rejecting empty diary entry");
            return Err(AppError::Validation(
                "diary content is required".to_string(),
            ));
        }

        let now = Utc::now();
        let entry = DiaryEntry {
            id: new_record_id(now),
            date: draft.date,
            content: draft.content,
            dominant: report.scores.dominant(),
            scores: report.scores,
            author: draft.author,
            created_at: now,
            updated_at: now,
        };

        self.items.insert(0, entry);
        if let Err(e) = self.store.write_collection(keys::DIARY_ENTRIES, &self.items) {
            self.items.remove(0);
            return Err(e.into());
        }

        info!("Added diary entry {}", self.items[0].id);
        Ok(&self.items[0])
    }

    /// Rewrites an entry's text and, when the caller re-scored it, its
    /// sentiment.
    pub fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        rescored: Option<&EmotionReport>,
    ) -> Result<(), AppError> {
        let index = self
            .items
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("diary entry {id}")))?;

        let previous = self.items[index].clone();
        let entry = &mut self.items[index];
        if let Some(content) = content {
            entry.content = content;
        }
        if let Some(report) = rescored {
            entry.scores = report.scores;
            entry.dominant = report.scores.dominant();
        }
        entry.updated_at = Utc::now();

        if let Err(e) = self.store.write_collection(keys::DIARY_ENTRIES, &self.items) {
            self.items[index] = previous;
            return Err(e.into());
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<(), AppError> {
        let index = self
            .items
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("diary entry {id}")))?;

        let removed = self.items.remove(index);
        if let Err(e) = self.store.write_collection(keys::DIARY_ENTRIES, &self.items) {
            self.items.insert(index, removed);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{EmotionCategory, EmotionScores, ScoreSource};
    use crate::models::diary::AuthorRole;
    use crate::store::StoreAdapter;

    fn report(scores: EmotionScores) -> EmotionReport {
        EmotionReport {
            dominant: scores.dominant(),
            scores,
            source: ScoreSource::Model,
        }
    }

    fn sad_scores() -> EmotionScores {
        EmotionScores {
            joy: 0,
            happiness: 0,
            surprise: 10,
            sadness: 70,
            anger: 10,
            fear: 10,
        }
    }

    fn draft(content: &str) -> DiaryDraft {
        DiaryDraft {
            date: "2024-05-01".parse().unwrap(),
            content: content.to_string(),
            author: AuthorRole::Senior,
        }
    }

    fn open_repository(dir: &tempfile::TempDir) -> DiaryRepository {
        let store = StoreAdapter::open(dir.path(), 1 << 20).unwrap();
        DiaryRepository::load(store)
    }

    #[test]
    fn test_add_persists_entry_with_recomputed_dominant() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);

        // Hand the repository a report whose dominant tag is wrong on purpose;
        // the stored entry must carry the argmax of the vector.
        let mut tampered = report(sad_scores());
        tampered.dominant = EmotionCategory::Joy;

        let entry = repository.add(draft("A quiet, rainy day."), &tampered).unwrap();
        assert_eq!(entry.dominant, EmotionCategory::Sadness);
        assert_eq!(repository.all().len(), 1);
    }

    #[test]
    fn test_add_rejects_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);
        let result = repository.add(draft("   "), &report(sad_scores()));
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repository.all().is_empty());
    }

    #[test]
    fn test_update_with_rescore_replaces_sentiment() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);
        let id = repository
            .add(draft("A quiet day."), &report(sad_scores()))
            .unwrap()
            .id
            .clone();

        let happier = EmotionScores {
            joy: 20,
            happiness: 60,
            surprise: 20,
            sadness: 0,
            anger: 0,
            fear: 0,
        };
        repository
            .update(&id, Some("A quiet but good day.".to_string()), Some(&report(happier)))
            .unwrap();

        let entry = repository.get(&id).unwrap();
        assert_eq!(entry.content, "A quiet but good day.");
        assert_eq!(entry.dominant, EmotionCategory::Happiness);
    }

    #[test]
    fn test_remove_deletes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);
        let id = repository
            .add(draft("Entry"), &report(sad_scores()))
            .unwrap()
            .id
            .clone();
        repository.remove(&id).unwrap();
        assert!(repository.all().is_empty());
        assert!(matches!(
            repository.remove(&id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_entries_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreAdapter::open(dir.path(), 1 << 20).unwrap();
        {
            let mut repository = DiaryRepository::load(store.clone());
            repository.add(draft("Persisted"), &report(sad_scores())).unwrap();
        }
        let repository = DiaryRepository::load(store);
        assert_eq!(repository.all().len(), 1);
        assert_eq!(repository.all()[0].content, "Persisted");
    }
}
