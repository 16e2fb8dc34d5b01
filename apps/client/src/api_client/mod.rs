//! Remote REST client — every call to the companion API goes through here.
//!
//! Plain JSON on success; on non-2xx the best-effort `message`/`error` field
//! is extracted from the body into a typed error. Transport failures and
//! timeouts surface as `ApiError::Http` and are treated by callers as normal
//! remote failures (local state stays authoritative).

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::location::{SafeZone, SharedLocation};
use crate::models::medication::SharedMedication;
use crate::models::memory::Memory;
use crate::models::notification::Notification;
use crate::models::user::Counterpart;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Bearer-authenticated JSON client for the companion API. Cheap to clone;
/// clones share the token cell, so a login observed by one clone is observed
/// by all.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().expect("token cell poisoned") = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.read().expect("token cell poisoned").is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().expect("token cell poisoned").as_deref() {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }
        response.json().await.map_err(ApiError::Http)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!("GET {path}");
        let response = self.authorize(self.client.get(self.url(path))).send().await?;
        Self::decode(response).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!("POST {path}");
        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub(crate) async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!("PUT {path}");
        let response = self
            .authorize(self.client.put(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        debug!("DELETE {path}");
        let response = self
            .authorize(self.client.delete(self.url(path)))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Memories
    // ────────────────────────────────────────────────────────────────────

    pub async fn fetch_memories(&self) -> Result<Vec<Memory>, ApiError> {
        self.get_json("/api/v1/memories").await
    }

    pub async fn push_memory(&self, memory: &Memory) -> Result<(), ApiError> {
        self.post_json::<_, serde_json::Value>("/api/v1/memories", memory)
            .await
            .map(|_| ())
    }

    pub async fn delete_memory(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/v1/memories/{id}")).await
    }

    // ────────────────────────────────────────────────────────────────────
    // Medications
    // ────────────────────────────────────────────────────────────────────

    pub async fn fetch_medications(&self) -> Result<Vec<SharedMedication>, ApiError> {
        self.get_json("/api/v1/medications").await
    }

    pub async fn push_medication(&self, medication: &SharedMedication) -> Result<(), ApiError> {
        self.post_json::<_, serde_json::Value>("/api/v1/medications", medication)
            .await
            .map(|_| ())
    }

    pub async fn update_medication(&self, medication: &SharedMedication) -> Result<(), ApiError> {
        self.put_json::<_, serde_json::Value>(
            &format!("/api/v1/medications/{}", medication.id),
            medication,
        )
        .await
        .map(|_| ())
    }

    // ────────────────────────────────────────────────────────────────────
    // Locations & safe zone
    // ────────────────────────────────────────────────────────────────────

    pub async fn fetch_locations(&self) -> Result<Vec<SharedLocation>, ApiError> {
        self.get_json("/api/v1/locations").await
    }

    pub async fn push_location(&self, location: &SharedLocation) -> Result<(), ApiError> {
        self.put_json::<_, serde_json::Value>("/api/v1/locations", location)
            .await
            .map(|_| ())
    }

    /// The configured safe zone, or `None` when the caregiver has not set one.
    pub async fn fetch_safe_zone(&self) -> Result<Option<SafeZone>, ApiError> {
        match self.get_json("/api/v1/safe-zone").await {
            Ok(zone) => Ok(Some(zone)),
            Err(ApiError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn put_safe_zone(&self, zone: &SafeZone) -> Result<(), ApiError> {
        self.put_json::<_, serde_json::Value>("/api/v1/safe-zone", zone)
            .await
            .map(|_| ())
    }

    // ────────────────────────────────────────────────────────────────────
    // Notifications
    // ────────────────────────────────────────────────────────────────────

    pub async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get_json("/api/v1/notifications").await
    }

    pub async fn push_notification(&self, notification: &Notification) -> Result<(), ApiError> {
        self.post_json::<_, serde_json::Value>("/api/v1/notifications", notification)
            .await
            .map(|_| ())
    }

    // ────────────────────────────────────────────────────────────────────
    // Connections
    // ────────────────────────────────────────────────────────────────────

    /// Asks the server to pair this account with the account behind `email`.
    /// Only a confirmed counterpart is returned; anything else is an error.
    pub async fn verify_connection(&self, email: &str) -> Result<Counterpart, ApiError> {
        self.post_json("/api/v1/connections", &serde_json::json!({ "email": email }))
            .await
    }

    pub async fn delete_connection(&self) -> Result<(), ApiError> {
        self.delete("/api/v1/connections").await
    }
}

/// Best-effort error message extraction: `message`, then `error` as a string,
/// then the nested `error.message` shape; the raw body when nothing matches.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
        {
            return message.to_string();
        }
    }
    body.to_string()
}
