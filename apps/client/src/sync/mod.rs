//! Shared-data synchronizer — local-first mutators plus periodic best-effort
//! pull over the shared collections (memories, medications, locations,
//! notifications).
//!
//! Every mutator applies to memory and the local store first, then pushes
//! remotely; a failed push never rolls the local change back, it only shows
//! up in the returned outcome. Pulls reconcile per record id by last-modified
//! timestamp, and a failed pull leaves that resource's local state exactly as
//! it was. The remote is a mirror; local state is what the UI trusts.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::connection::PairingState;
use crate::errors::AppError;
use crate::models::location::SharedLocation;
use crate::models::medication::SharedMedication;
use crate::models::memory::Memory;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::{new_record_id, SyncRecord};
use crate::store::{keys, StoreAdapter, Timestamped};

/// How a mutator's remote push went. The local change is durable either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local change applied and mirrored to the remote.
    Synced,
    /// Local change applied; the remote push failed for the given reason.
    LocalOnly(String),
}

/// How one resource's pull went during `sync()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote snapshot was reconciled into local state.
    Merged,
    /// The pull failed; local state for this resource is untouched.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub memories: PullOutcome,
    pub medications: PullOutcome,
    pub locations: PullOutcome,
    pub notifications: PullOutcome,
}

#[derive(Default)]
struct SharedCollections {
    memories: Vec<Memory>,
    medications: Vec<SharedMedication>,
    locations: Vec<SharedLocation>,
    notifications: Vec<Notification>,
}

/// Cheap to clone; clones share the in-memory collections, so the periodic
/// task and the UI-facing handle observe the same state.
#[derive(Clone)]
pub struct Synchronizer {
    api: ApiClient,
    store: StoreAdapter,
    shared: Arc<Mutex<SharedCollections>>,
}

impl Synchronizer {
    /// Loads the shared collections from the local store.
    pub fn load(api: ApiClient, store: StoreAdapter) -> Self {
        let collections = SharedCollections {
            memories: store.read_or(keys::MEMORIES, Vec::new()),
            medications: store.read_or(keys::MEDICATIONS, Vec::new()),
            locations: store.read_or(keys::LOCATIONS, Vec::new()),
            notifications: store.read_or(keys::NOTIFICATIONS, Vec::new()),
        };
        Self {
            api,
            store,
            shared: Arc::new(Mutex::new(collections)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedCollections> {
        // Never held across an await.
        self.shared.lock().expect("sync state poisoned")
    }

    pub fn memories(&self) -> Vec<Memory> {
        self.lock().memories.clone()
    }

    pub fn medications(&self) -> Vec<SharedMedication> {
        self.lock().medications.clone()
    }

    pub fn locations(&self) -> Vec<SharedLocation> {
        self.lock().locations.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    // ────────────────────────────────────────────────────────────────────
    // Mutators: local-first, push best-effort
    // ────────────────────────────────────────────────────────────────────

    /// Shares a memory. While paired, the counterpart also gets a local
    /// notification (no push transport behind it).
    pub async fn add_memory(&self, memory: Memory) -> SyncOutcome {
        {
            let mut shared = self.lock();
            shared.memories.insert(0, memory.clone());
            persist(&self.store, keys::MEMORIES, &shared.memories);
        }
        self.notify_counterpart(&memory);

        match self.api.push_memory(&memory).await {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                warn!("Memory push failed, kept locally: {e}");
                SyncOutcome::LocalOnly(e.to_string())
            }
        }
    }

    pub async fn add_medication(&self, medication: SharedMedication) -> SyncOutcome {
        {
            let mut shared = self.lock();
            shared.medications.insert(0, medication.clone());
            persist(&self.store, keys::MEDICATIONS, &shared.medications);
        }

        match self.api.push_medication(&medication).await {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                warn!("Medication push failed, kept locally: {e}");
                SyncOutcome::LocalOnly(e.to_string())
            }
        }
    }

    /// Marks a dose taken (monotonic; see `SharedMedication::mark_taken`).
    pub async fn mark_medication_taken(&self, id: &str) -> Result<SyncOutcome, AppError> {
        let updated = {
            let mut shared = self.lock();
            let medication = shared
                .medications
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| AppError::NotFound(format!("medication {id}")))?;
            medication.mark_taken(Utc::now());
            let snapshot = medication.clone();
            persist(&self.store, keys::MEDICATIONS, &shared.medications);
            snapshot
        };

        match self.api.update_medication(&updated).await {
            Ok(()) => Ok(SyncOutcome::Synced),
            Err(e) => {
                warn!("Medication update push failed, kept locally: {e}");
                Ok(SyncOutcome::LocalOnly(e.to_string()))
            }
        }
    }

    /// Records the owner's current position, replacing their previous one.
    pub async fn update_location(&self, location: SharedLocation) -> SyncOutcome {
        {
            let mut shared = self.lock();
            match shared
                .locations
                .iter_mut()
                .find(|l| l.owner_id == location.owner_id)
            {
                Some(existing) => *existing = location.clone(),
                None => shared.locations.push(location.clone()),
            }
            persist(&self.store, keys::LOCATIONS, &shared.locations);
        }

        match self.api.push_location(&location).await {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                warn!("Location push failed, kept locally: {e}");
                SyncOutcome::LocalOnly(e.to_string())
            }
        }
    }

    pub async fn add_notification(&self, notification: Notification) -> SyncOutcome {
        {
            let mut shared = self.lock();
            shared.notifications.insert(0, notification.clone());
            persist(&self.store, keys::NOTIFICATIONS, &shared.notifications);
        }

        match self.api.push_notification(&notification).await {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                warn!("Notification push failed, kept locally: {e}");
                SyncOutcome::LocalOnly(e.to_string())
            }
        }
    }

    fn notify_counterpart(&self, memory: &Memory) {
        let pairing: PairingState = self.store.read_or(keys::PAIRING, PairingState::default());
        if !pairing.connected {
            return;
        }
        let Some(counterpart) = pairing.counterpart else {
            return;
        };

        let now = Utc::now();
        let notification = Notification {
            id: new_record_id(now),
            recipient_id: counterpart.id,
            kind: NotificationKind::MemoryShared,
            message: format!("A new memory was shared: {}", memory.title),
            read: false,
            created_at: now,
        };

        let mut shared = self.lock();
        shared.notifications.insert(0, notification);
        persist(&self.store, keys::NOTIFICATIONS, &shared.notifications);
        debug!("Queued memory notification for {}", memory.title);
    }

    // ────────────────────────────────────────────────────────────────────
    // Pull: per-resource, all-or-nothing per resource
    // ────────────────────────────────────────────────────────────────────

    /// Pulls every resource type. Idempotent: against a stable remote with no
    /// intervening local mutation, a second call changes nothing.
    pub async fn sync(&self) -> SyncReport {
        let memories = self.pull_memories().await;
        let medications = self.pull_medications().await;
        let locations = self.pull_locations().await;
        let notifications = self.pull_notifications().await;

        let report = SyncReport {
            memories,
            medications,
            locations,
            notifications,
        };
        debug!("Sync pass: {report:?}");
        report
    }

    async fn pull_memories(&self) -> PullOutcome {
        match self.api.fetch_memories().await {
            Ok(remote) => {
                let mut shared = self.lock();
                shared.memories = merge_records(&shared.memories, &remote);
                persist(&self.store, keys::MEMORIES, &shared.memories);
                PullOutcome::Merged
            }
            Err(e) => {
                debug!("Memories pull failed, keeping local state: {e}");
                PullOutcome::Failed(e.to_string())
            }
        }
    }

    async fn pull_medications(&self) -> PullOutcome {
        match self.api.fetch_medications().await {
            Ok(remote) => {
                let mut shared = self.lock();
                shared.medications = merge_records(&shared.medications, &remote);
                persist(&self.store, keys::MEDICATIONS, &shared.medications);
                PullOutcome::Merged
            }
            Err(e) => {
                debug!("Medications pull failed, keeping local state: {e}");
                PullOutcome::Failed(e.to_string())
            }
        }
    }

    async fn pull_locations(&self) -> PullOutcome {
        match self.api.fetch_locations().await {
            Ok(remote) => {
                let mut shared = self.lock();
                shared.locations = merge_records(&shared.locations, &remote);
                persist(&self.store, keys::LOCATIONS, &shared.locations);
                PullOutcome::Merged
            }
            Err(e) => {
                debug!("Locations pull failed, keeping local state: {e}");
                PullOutcome::Failed(e.to_string())
            }
        }
    }

    async fn pull_notifications(&self) -> PullOutcome {
        match self.api.fetch_notifications().await {
            Ok(remote) => {
                let mut shared = self.lock();
                shared.notifications = merge_records(&shared.notifications, &remote);
                persist(&self.store, keys::NOTIFICATIONS, &shared.notifications);
                PullOutcome::Merged
            }
            Err(e) => {
                debug!("Notifications pull failed, keeping local state: {e}");
                PullOutcome::Failed(e.to_string())
            }
        }
    }

    /// Starts the periodic pull: one pass immediately, then one per interval,
    /// until the handle is stopped or dropped.
    pub fn start(&self, interval: Duration) -> SyncHandle {
        let synchronizer = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                synchronizer.sync().await;
            }
        });
        info!("Periodic sync started ({}s interval)", interval.as_secs());
        SyncHandle { task }
    }
}

/// Cancels the periodic sync when stopped or dropped.
pub struct SyncHandle {
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn stop(self) {
        self.task.abort();
        info!("Periodic sync stopped");
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reconciles a local collection against a remote snapshot: per id the newer
/// side wins, ids unique to either side survive, newest-first order.
pub(crate) fn merge_records<T>(local: &[T], remote: &[T]) -> Vec<T>
where
    T: SyncRecord + Timestamped + Clone,
{
    let mut merged: Vec<T> = Vec::with_capacity(local.len() + remote.len());
    for record in remote {
        match local.iter().find(|l| l.sync_id() == record.sync_id()) {
            Some(ours) if ours.modified_at() > record.modified_at() => merged.push(ours.clone()),
            _ => merged.push(record.clone()),
        }
    }
    for record in local {
        if !remote.iter().any(|r| r.sync_id() == record.sync_id()) {
            merged.push(record.clone());
        }
    }
    merged.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    merged
}

fn persist<T>(store: &StoreAdapter, key: &str, items: &[T])
where
    T: Serialize + Timestamped + Clone,
{
    if let Err(e) = store.write_collection(key, items) {
        warn!("Failed to persist '{key}' locally: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::memory::GeoPoint;
    use crate::models::user::{Counterpart, Role};
    use chrono::{DateTime, TimeZone};

    fn at(secs: i64) -> DateTime<chrono::Utc> {
        chrono::Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn make_memory(id: &str, created: i64, updated: i64, title: &str) -> Memory {
        Memory {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            image: "data:image/jpeg;base64,aGVsbG8=".to_string(),
            location: GeoPoint {
                lat: 35.87,
                lng: 128.60,
                address: "Park".to_string(),
                description: None,
            },
            date: "2024-05-01".parse().unwrap(),
            created_at: at(created),
            updated_at: at(updated),
            tags: Vec::new(),
        }
    }

    fn make_medication(id: &str, created: i64) -> SharedMedication {
        SharedMedication {
            id: id.to_string(),
            owner_id: "s1".to_string(),
            owner_name: "Sunja".to_string(),
            name: "Donepezil".to_string(),
            dosage: "5mg".to_string(),
            time: "08:00".to_string(),
            taken: false,
            taken_at: None,
            created_at: at(created),
            updated_at: at(created),
        }
    }

    /// Synchronizer whose every remote call fails fast (unroutable port).
    fn offline_synchronizer(dir: &tempfile::TempDir) -> Synchronizer {
        let api = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1));
        let store = StoreAdapter::open(dir.path(), 1 << 20).unwrap();
        Synchronizer::load(api, store)
    }

    #[test]
    fn test_merge_remote_newer_wins() {
        let local = vec![make_memory("m1", 0, 10, "old title")];
        let remote = vec![make_memory("m1", 0, 20, "new title")];
        let merged = merge_records(&local, &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "new title");
    }

    #[test]
    fn test_merge_local_newer_wins() {
        let local = vec![make_memory("m1", 0, 30, "edited locally")];
        let remote = vec![make_memory("m1", 0, 20, "stale remote")];
        let merged = merge_records(&local, &remote);
        assert_eq!(merged[0].title, "edited locally");
    }

    #[test]
    fn test_merge_keeps_records_unique_to_either_side() {
        let local = vec![make_memory("local-only", 5, 5, "mine")];
        let remote = vec![make_memory("remote-only", 1, 1, "theirs")];
        let merged = merge_records(&local, &remote);
        assert_eq!(merged.len(), 2);
        // newest-first
        assert_eq!(merged[0].id, "local-only");
        assert_eq!(merged[1].id, "remote-only");
    }

    #[test]
    fn test_merge_is_idempotent_against_stable_remote() {
        let local = vec![
            make_memory("m1", 0, 30, "edited locally"),
            make_memory("m2", 2, 2, "untouched"),
        ];
        let remote = vec![
            make_memory("m1", 0, 20, "stale remote"),
            make_memory("m3", 1, 1, "remote only"),
        ];
        let once = merge_records(&local, &remote);
        let twice = merge_records(&once, &remote);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_mutator_keeps_local_state_when_push_fails() {
        let dir = tempfile::tempdir().unwrap();
        let synchronizer = offline_synchronizer(&dir);

        let outcome = synchronizer.add_medication(make_medication("m1", 0)).await;
        assert!(matches!(outcome, SyncOutcome::LocalOnly(_)));

        // in memory and on disk despite the failed push
        assert_eq!(synchronizer.medications().len(), 1);
        let persisted: Vec<SharedMedication> =
            synchronizer.store.read_or(keys::MEDICATIONS, Vec::new());
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, "m1");
    }

    #[tokio::test]
    async fn test_failed_pull_leaves_local_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let synchronizer = offline_synchronizer(&dir);
        synchronizer.add_medication(make_medication("m1", 0)).await;
        let before = synchronizer.medications();

        let report = synchronizer.sync().await;
        assert!(matches!(report.medications, PullOutcome::Failed(_)));
        assert_eq!(synchronizer.medications(), before);

        let persisted: Vec<SharedMedication> =
            synchronizer.store.read_or(keys::MEDICATIONS, Vec::new());
        assert_eq!(persisted, before);
    }

    #[tokio::test]
    async fn test_mark_medication_taken_is_monotonic_and_local_first() {
        let dir = tempfile::tempdir().unwrap();
        let synchronizer = offline_synchronizer(&dir);
        synchronizer.add_medication(make_medication("m1", 0)).await;

        let outcome = synchronizer.mark_medication_taken("m1").await.unwrap();
        assert!(matches!(outcome, SyncOutcome::LocalOnly(_)));

        let medications = synchronizer.medications();
        assert!(medications[0].taken);
        let first_taken_at = medications[0].taken_at;

        synchronizer.mark_medication_taken("m1").await.unwrap();
        assert_eq!(synchronizer.medications()[0].taken_at, first_taken_at);
    }

    #[tokio::test]
    async fn test_mark_medication_taken_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let synchronizer = offline_synchronizer(&dir);
        assert!(matches!(
            synchronizer.mark_medication_taken("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_location_replaces_per_owner() {
        let dir = tempfile::tempdir().unwrap();
        let synchronizer = offline_synchronizer(&dir);

        let mut first = SharedLocation {
            owner_id: "s1".to_string(),
            owner_name: "Sunja".to_string(),
            lat: 35.87,
            lng: 128.60,
            address: "Home".to_string(),
            recorded_at: at(0),
        };
        synchronizer.update_location(first.clone()).await;

        first.address = "Market".to_string();
        first.recorded_at = at(60);
        synchronizer.update_location(first).await;

        let locations = synchronizer.locations();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].address, "Market");
    }

    #[tokio::test]
    async fn test_shared_memory_notifies_paired_counterpart() {
        let dir = tempfile::tempdir().unwrap();
        let synchronizer = offline_synchronizer(&dir);
        synchronizer
            .store
            .write(
                keys::PAIRING,
                &PairingState {
                    connected: true,
                    counterpart: Some(Counterpart {
                        id: "g1".to_string(),
                        name: "Minji".to_string(),
                        email: "minji@example.com".to_string(),
                        role: Role::Guardian,
                    }),
                },
            )
            .unwrap();

        synchronizer
            .add_memory(make_memory("m1", 0, 0, "Walk"))
            .await;

        let notifications = synchronizer.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].recipient_id, "g1");
        assert_eq!(notifications[0].kind, NotificationKind::MemoryShared);
        assert!(notifications[0].message.contains("Walk"));
    }

    #[tokio::test]
    async fn test_unpaired_memory_add_queues_no_notification() {
        let dir = tempfile::tempdir().unwrap();
        let synchronizer = offline_synchronizer(&dir);
        synchronizer
            .add_memory(make_memory("m1", 0, 0, "Walk"))
            .await;
        assert!(synchronizer.notifications().is_empty());
    }
}
