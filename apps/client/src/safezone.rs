//! Safe-zone management — the caregiver's geofence around the senior's
//! expected area.
//!
//! A single current zone, replaced wholesale on each save: persisted locally
//! first, pushed best-effort, and refreshed from the server with
//! last-writer-wins (there is no per-record history to merge).

use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::AppError;
use crate::models::location::{SafeZone, SharedLocation};
use crate::store::{keys, StoreAdapter};
use crate::sync::SyncOutcome;

#[derive(Clone)]
pub struct SafeZoneManager {
    api: ApiClient,
    store: StoreAdapter,
}

impl SafeZoneManager {
    pub fn new(api: ApiClient, store: StoreAdapter) -> Self {
        Self { api, store }
    }

    /// The locally known zone, if the caregiver has set one.
    pub fn current(&self) -> Option<SafeZone> {
        self.store.read_opt(keys::SAFE_ZONE)
    }

    /// Replaces the zone. Local persistence is the operation; the push to the
    /// server is best-effort and reported in the outcome.
    pub async fn save(&self, zone: SafeZone) -> Result<SyncOutcome, AppError> {
        self.store.write(keys::SAFE_ZONE, &zone)?;
        info!(
            "Safe zone saved: ({}, {}) r={}m",
            zone.lat, zone.lng, zone.radius_m
        );

        match self.api.put_safe_zone(&zone).await {
            Ok(()) => Ok(SyncOutcome::Synced),
            Err(e) => {
                warn!("Safe zone push failed, kept locally: {e}");
                Ok(SyncOutcome::LocalOnly(e.to_string()))
            }
        }
    }

    /// Adopts the server's zone. On failure the local zone stands.
    pub async fn refresh(&self) -> Result<Option<SafeZone>, AppError> {
        let remote = self.api.fetch_safe_zone().await?;
        match &remote {
            Some(zone) => self.store.write(keys::SAFE_ZONE, zone)?,
            None => self.store.remove(keys::SAFE_ZONE)?,
        }
        Ok(remote)
    }

    /// Whether the senior's last reported position is inside the zone.
    /// `None` when either the zone or the position is unknown.
    pub fn status_of(&self, location: Option<&SharedLocation>) -> Option<bool> {
        let zone = self.current()?;
        let location = location?;
        Some(zone.contains(location.lat, location.lng))
    }
}
