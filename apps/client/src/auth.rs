//! Authentication against the companion API.
//!
//! The login payload is decoded exactly once, here, into its canonical shape;
//! a response missing the token or profile is rejected as malformed instead
//! of being probed field-by-field. On success the token and profile snapshot
//! persist through the store so the session survives a restart.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api_client::{ApiClient, ApiError};
use crate::errors::AppError;
use crate::models::user::{Role, UserProfile};
use crate::store::{keys, StoreAdapter};

#[derive(Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Canonical session payload returned by login and register.
#[derive(Debug, Deserialize)]
struct SessionPayload {
    token: String,
    user: UserProfile,
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    store: StoreAdapter,
}

impl AuthService {
    pub fn new(api: ApiClient, store: StoreAdapter) -> Self {
        Self { api, store }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AppError> {
        let raw: serde_json::Value = self.api.post_json("/api/v1/auth/login", credentials).await?;
        self.adopt_session(raw)
    }

    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, AppError> {
        let raw: serde_json::Value = self
            .api
            .post_json("/api/v1/auth/register", registration)
            .await?;
        self.adopt_session(raw)
    }

    fn adopt_session(&self, raw: serde_json::Value) -> Result<UserProfile, AppError> {
        let session: SessionPayload = serde_json::from_value(raw).map_err(|e| {
            AppError::Remote(ApiError::Decode(format!(
                "unrecognized session response shape: {e}"
            )))
        })?;

        self.api.set_token(Some(session.token.clone()));
        self.store.write(keys::AUTH_TOKEN, &session.token)?;
        self.store.write(keys::USER_PROFILE, &session.user)?;

        info!("Signed in as {}", session.user.email);
        Ok(session.user)
    }

    /// Restores a previously persisted session, if one exists. The restored
    /// token is installed on the API client so subsequent calls carry it.
    pub fn restore(&self) -> Option<UserProfile> {
        let token: String = self.store.read_opt(keys::AUTH_TOKEN)?;
        let profile: UserProfile = self.store.read_opt(keys::USER_PROFILE)?;
        self.api.set_token(Some(token));
        Some(profile)
    }

    /// Clears the in-memory token and the persisted session.
    pub fn logout(&self) {
        self.api.set_token(None);
        if let Err(e) = self.store.remove(keys::AUTH_TOKEN) {
            warn!("Failed to clear persisted token: {e}");
        }
        if let Err(e) = self.store.remove(keys::USER_PROFILE) {
            warn!("Failed to clear persisted profile: {e}");
        }
        info!("Signed out");
    }
}
