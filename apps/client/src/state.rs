use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::api_client::ApiClient;
use crate::auth::{AuthService, Credentials, Registration};
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::diary::DiaryRepository;
use crate::emotion::{EmotionScorer, LlmEmotionScorer};
use crate::errors::AppError;
use crate::llm_client::{self, LlmClient};
use crate::memories::MemoryRepository;
use crate::models::user::UserProfile;
use crate::recognition::FaceRecognizer;
use crate::safezone::SafeZoneManager;
use crate::store::StoreAdapter;
use crate::sync::{SyncHandle, Synchronizer};

/// The application-state container the screens work against: one store, one
/// API client, one LLM client, and a single mutation API per entity type.
pub struct AppState {
    pub config: Config,
    pub store: StoreAdapter,
    pub api: ApiClient,
    pub llm: LlmClient,
    /// Pluggable emotion scorer. Default: `LlmEmotionScorer`; tests swap in a
    /// fixed backend.
    pub emotion: Arc<dyn EmotionScorer>,
    pub recognizer: FaceRecognizer,
    pub auth: AuthService,
    pub connection: ConnectionManager,
    pub safe_zone: SafeZoneManager,
    pub sync: Synchronizer,
    sync_handle: Option<SyncHandle>,
}

impl AppState {
    /// Wires the full data layer from configuration.
    pub fn init(config: Config) -> Result<Self> {
        let store = StoreAdapter::open(&config.data_dir, config.store_byte_budget)?;
        info!("Store opened at {}", config.data_dir.display());

        let api = ApiClient::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        );

        let llm = LlmClient::new(config.anthropic_api_key.clone());
        info!("LLM client initialized (model: {})", llm_client::MODEL);

        let emotion: Arc<dyn EmotionScorer> = Arc::new(LlmEmotionScorer::new(llm.clone()));
        let recognizer = FaceRecognizer::new(llm.clone());
        let auth = AuthService::new(api.clone(), store.clone());
        let connection = ConnectionManager::new(api.clone(), store.clone());
        let safe_zone = SafeZoneManager::new(api.clone(), store.clone());
        let sync = Synchronizer::load(api.clone(), store.clone());

        Ok(Self {
            config,
            store,
            api,
            llm,
            emotion,
            recognizer,
            auth,
            connection,
            safe_zone,
            sync,
            sync_handle: None,
        })
    }

    /// A fresh repository over the persisted memories. Screens construct one
    /// when they gain focus, so writes from the other role view are observed.
    pub fn memories(&self) -> MemoryRepository {
        MemoryRepository::load(self.store.clone())
    }

    /// A fresh repository over the persisted diary entries.
    pub fn diaries(&self) -> DiaryRepository {
        DiaryRepository::load(self.store.clone())
    }

    /// Signs in and starts the periodic sync for the session.
    pub async fn sign_in(&mut self, credentials: &Credentials) -> Result<UserProfile, AppError> {
        let profile = self.auth.login(credentials).await?;
        self.start_sync();
        Ok(profile)
    }

    /// Registers a new account and starts the periodic sync.
    pub async fn sign_up(&mut self, registration: &Registration) -> Result<UserProfile, AppError> {
        let profile = self.auth.register(registration).await?;
        self.start_sync();
        Ok(profile)
    }

    /// Restores a persisted session, if any, and resumes syncing.
    pub fn resume_session(&mut self) -> Option<UserProfile> {
        let profile = self.auth.restore()?;
        self.start_sync();
        Some(profile)
    }

    /// Stops the periodic sync and clears the persisted session.
    pub fn sign_out(&mut self) {
        if let Some(handle) = self.sync_handle.take() {
            handle.stop();
        }
        self.auth.logout();
    }

    fn start_sync(&mut self) {
        let interval = Duration::from_secs(self.config.sync_interval_secs);
        // Replacing an existing handle aborts the previous task.
        self.sync_handle = Some(self.sync.start(interval));
    }
}
