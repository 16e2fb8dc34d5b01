//! Pairing between a guardian account and a senior account.
//!
//! A pairing only comes into existence when the server confirms it; the
//! locally persisted state is a cache of that answer, shared with the
//! synchronizer (which reads it to address counterpart notifications).
//! Unpairing always succeeds locally, with the server told best-effort.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::AppError;
use crate::models::user::Counterpart;
use crate::store::{keys, StoreAdapter};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairingState {
    pub connected: bool,
    pub counterpart: Option<Counterpart>,
}

#[derive(Clone)]
pub struct ConnectionManager {
    api: ApiClient,
    store: StoreAdapter,
}

impl ConnectionManager {
    pub fn new(api: ApiClient, store: StoreAdapter) -> Self {
        Self { api, store }
    }

    pub fn current(&self) -> PairingState {
        self.store.read_or(keys::PAIRING, PairingState::default())
    }

    pub fn is_connected(&self) -> bool {
        self.current().connected
    }

    /// Pairs with the account behind `email`, server-verified. Nothing is
    /// persisted unless the server confirms the counterpart.
    pub async fn connect(&self, email: &str) -> Result<Counterpart, AppError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation(
                "a valid counterpart email is required".to_string(),
            ));
        }

        let counterpart = self.api.verify_connection(email).await?;
        self.store.write(
            keys::PAIRING,
            &PairingState {
                connected: true,
                counterpart: Some(counterpart.clone()),
            },
        )?;

        info!("Paired with {} ({})", counterpart.name, counterpart.email);
        Ok(counterpart)
    }

    /// Clears the pairing. The server is told best-effort; a failure there
    /// never blocks the local disconnect.
    pub async fn disconnect(&self) -> Result<(), AppError> {
        if let Err(e) = self.api.delete_connection().await {
            warn!("Could not notify server of disconnect: {e}");
        }
        self.store.write(keys::PAIRING, &PairingState::default())?;
        info!("Pairing cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use std::time::Duration;

    fn manager(dir: &tempfile::TempDir) -> ConnectionManager {
        // Unroutable port: every remote call fails fast.
        let api = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1));
        let store = StoreAdapter::open(dir.path(), 1 << 20).unwrap();
        ConnectionManager::new(api, store)
    }

    fn paired_state() -> PairingState {
        PairingState {
            connected: true,
            counterpart: Some(Counterpart {
                id: "s1".to_string(),
                name: "Sunja".to_string(),
                email: "sunja@example.com".to_string(),
                role: Role::Senior,
            }),
        }
    }

    #[test]
    fn test_default_state_is_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir);
        assert!(!manager.is_connected());
        assert!(manager.current().counterpart.is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_email() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir);
        assert!(matches!(
            manager.connect("not-an-email").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.connect("  ").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_without_server_confirms_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir);
        let result = manager.connect("sunja@example.com").await;
        assert!(matches!(result, Err(AppError::Remote(_))));
        // no unverified pairing is persisted
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_clears_pairing_despite_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir);
        manager.store.write(keys::PAIRING, &paired_state()).unwrap();
        assert!(manager.is_connected());

        manager.disconnect().await.unwrap();
        assert!(!manager.is_connected());
        assert_eq!(manager.current(), PairingState::default());
    }
}
