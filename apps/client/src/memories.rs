//! Memory repository — write-through CRUD over the persisted memory
//! collection, newest first.
//!
//! Role views sharing one browser profile each hold their own repository over
//! the same store key; `reload` on focus regain is how one view observes the
//! other's writes. A failed persist rolls the in-memory mutation back so the
//! collection never drifts from what the store holds.

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::memory::{Memory, MemoryDraft, MemoryPatch};
use crate::models::new_record_id;
use crate::store::{keys, StoreAdapter};

pub struct MemoryRepository {
    store: StoreAdapter,
    items: Vec<Memory>,
}

impl MemoryRepository {
    pub fn load(store: StoreAdapter) -> Self {
        let mut repository = Self {
            store,
            items: Vec::new(),
        };
        repository.reload();
        repository
    }

    /// All memories, newest first.
    pub fn all(&self) -> &[Memory] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Memory> {
        self.items.iter().find(|m| m.id == id)
    }

    /// Re-reads the persisted collection, picking up writes made by the other
    /// role view (or the synchronizer) since this repository loaded.
    pub fn reload(&mut self) {
        let mut items: Vec<Memory> = self.store.read_or(keys::MEMORIES, Vec::new());
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.items = items;
    }

    /// Creates a memory from a draft. Title, image, and location are required;
    /// a draft missing any of them is rejected without touching the
    /// collection.
    pub fn add(&mut self, draft: MemoryDraft) -> Result<&Memory, AppError> {
        if draft.title.trim().is_empty() {
            warn!("Rejecting memory draft without a title");
            return Err(AppError::Validation("memory title is required".to_string()));
        }
        if draft.image.trim().is_empty() {
            warn!("Rejecting memory draft without image data");
            return Err(AppError::Validation("memory image is required".to_string()));
        }
        let Some(location) = draft.location else {
            warn!("Rejecting memory draft without a location");
            return Err(AppError::Validation(
                "memory location is required".to_string(),
            ));
        };

        let now = Utc::now();
        let id = new_record_id(now);
        // Ids embed a random suffix; a colliding add is skipped, never merged.
        if self.items.iter().any(|m| m.id == id) {
            warn!("Memory id collision on {id}; skipping add");
            return Err(AppError::Validation("memory id collision".to_string()));
        }

        let memory = Memory {
            id,
            title: draft.title,
            description: draft.description,
            image: draft.image,
            location,
            date: draft.date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
            updated_at: now,
            tags: draft.tags,
        };

        self.items.insert(0, memory);
        if let Err(e) = self.store.write_collection(keys::MEMORIES, &self.items) {
            self.items.remove(0);
            return Err(e.into());
        }

        info!("Added memory {}", self.items[0].id);
        Ok(&self.items[0])
    }

    /// Merges the patch into the matching record and persists the collection.
    pub fn update(&mut self, id: &str, patch: MemoryPatch) -> Result<(), AppError> {
        let index = self
            .items
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("memory {id}")))?;

        let previous = self.items[index].clone();
        let memory = &mut self.items[index];
        if let Some(title) = patch.title {
            memory.title = title;
        }
        if let Some(description) = patch.description {
            memory.description = description;
        }
        if let Some(image) = patch.image {
            memory.image = image;
        }
        if let Some(location) = patch.location {
            memory.location = location;
        }
        if let Some(date) = patch.date {
            memory.date = date;
        }
        if let Some(tags) = patch.tags {
            memory.tags = tags;
        }
        memory.updated_at = Utc::now();

        if let Err(e) = self.store.write_collection(keys::MEMORIES, &self.items) {
            self.items[index] = previous;
            return Err(e.into());
        }
        Ok(())
    }

    /// Removes the matching record and persists the collection.
    pub fn remove(&mut self, id: &str) -> Result<(), AppError> {
        let index = self
            .items
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("memory {id}")))?;

        let removed = self.items.remove(index);
        if let Err(e) = self.store.write_collection(keys::MEMORIES, &self.items) {
            self.items.insert(index, removed);
            return Err(e.into());
        }

        info!("Removed memory {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::memory::GeoPoint;
    use crate::store::StoreAdapter;

    fn park() -> GeoPoint {
        GeoPoint {
            lat: 35.87,
            lng: 128.60,
            address: "Park".to_string(),
            description: None,
        }
    }

    fn walk_draft() -> MemoryDraft {
        MemoryDraft {
            title: "Walk".to_string(),
            description: "An afternoon walk".to_string(),
            image: "data:image/jpeg;base64,aGVsbG8=".to_string(),
            location: Some(park()),
            date: "2024-05-01".parse().ok(),
            tags: vec!["outdoors".to_string()],
        }
    }

    fn open_repository(dir: &tempfile::TempDir) -> MemoryRepository {
        let store = StoreAdapter::open(dir.path(), 1 << 20).unwrap();
        MemoryRepository::load(store)
    }

    fn sorted_ids(repository: &MemoryRepository) -> Vec<String> {
        let mut ids: Vec<String> = repository.all().iter().map(|m| m.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_add_valid_memory_prepends_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);

        repository.add(walk_draft()).unwrap();
        assert_eq!(repository.all().len(), 1);

        let mut second = walk_draft();
        second.title = "Market".to_string();
        repository.add(second).unwrap();

        assert_eq!(repository.all().len(), 2);
        // newest first
        assert_eq!(repository.all()[0].title, "Market");
        let first_id = repository.all()[1].id.clone();
        assert_ne!(repository.all()[0].id, first_id);
    }

    #[test]
    fn test_add_rejects_missing_required_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);

        let mut no_title = walk_draft();
        no_title.title = "  ".to_string();
        assert!(matches!(
            repository.add(no_title),
            Err(AppError::Validation(_))
        ));

        let mut no_image = walk_draft();
        no_image.image = String::new();
        assert!(matches!(
            repository.add(no_image),
            Err(AppError::Validation(_))
        ));

        let mut no_location = walk_draft();
        no_location.location = None;
        assert!(matches!(
            repository.add(no_location),
            Err(AppError::Validation(_))
        ));

        assert!(repository.all().is_empty());
    }

    #[test]
    fn test_add_then_remove_restores_prior_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);
        repository.add(walk_draft()).unwrap();
        let before = sorted_ids(&repository);

        let mut draft = walk_draft();
        draft.title = "Garden".to_string();
        let added_id = repository.add(draft).unwrap().id.clone();
        assert_eq!(repository.all().len(), 2);

        repository.remove(&added_id).unwrap();
        assert_eq!(sorted_ids(&repository), before);
        assert!(repository.get(&added_id).is_none());
    }

    #[test]
    fn test_memory_lifecycle_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);

        let id = repository.add(walk_draft()).unwrap().id.clone();
        assert_eq!(repository.all().len(), 1);
        assert_eq!(repository.all()[0].id, id);
        assert_eq!(repository.all()[0].title, "Walk");

        repository.remove(&id).unwrap();
        assert!(repository.all().is_empty());
    }

    #[test]
    fn test_update_merges_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);
        let id = repository.add(walk_draft()).unwrap().id.clone();

        repository
            .update(
                &id,
                MemoryPatch {
                    title: Some("Evening walk".to_string()),
                    ..MemoryPatch::default()
                },
            )
            .unwrap();

        let memory = repository.get(&id).unwrap();
        assert_eq!(memory.title, "Evening walk");
        // untouched fields survive
        assert_eq!(memory.location.address, "Park");
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);
        assert!(matches!(
            repository.update("missing", MemoryPatch::default()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_reload_observes_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreAdapter::open(dir.path(), 1 << 20).unwrap();
        let mut guardian_view = MemoryRepository::load(store.clone());
        let mut senior_view = MemoryRepository::load(store);

        guardian_view.add(walk_draft()).unwrap();
        assert!(senior_view.all().is_empty());

        senior_view.reload();
        assert_eq!(senior_view.all().len(), 1);
        assert_eq!(senior_view.all()[0].title, "Walk");
    }

    #[test]
    fn test_failed_persist_rolls_back_add() {
        let dir = tempfile::tempdir().unwrap();
        let mut repository = open_repository(&dir);
        // Pull the directory out from under the store so the write fails.
        std::fs::remove_dir_all(dir.path()).unwrap();

        assert!(matches!(
            repository.add(walk_draft()),
            Err(AppError::Storage(_))
        ));
        assert!(repository.all().is_empty());
    }
}
