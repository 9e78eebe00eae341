// src/state.rs

use std::sync::Arc;

use crate::{
    api::ApiClient,
    assessment::{AssessmentError, AssessmentRunner, RunnerContext},
    assignments::AssignmentClient,
    config::Config,
    error::ClientError,
    models::assessment::AssessmentKind,
    notifications::UnreadCountWatcher,
    session::SessionManager,
    storage::{KeyValueStore, SqliteStore},
};

/// Dependency container shared by every screen of the client.
///
/// Replaces an ambient global auth context with an explicit `init` / `dispose`
/// lifecycle.
#[derive(Clone)]
pub struct ClientState {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub store: Arc<dyn KeyValueStore>,
    pub session: Arc<SessionManager>,
}

impl ClientState {
    /// Opens durable storage, builds the HTTP client and restores the session.
    pub async fn init(config: Config) -> Result<Self, ClientError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::connect(&config.storage_url).await?);
        Self::with_store(config, store).await
    }

    pub async fn with_store(
        config: Config,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let api = Arc::new(ApiClient::new(&config)?);
        let session = Arc::new(SessionManager::init(api.clone(), store.clone()).await?);

        Ok(Self {
            config,
            api,
            store,
            session,
        })
    }

    /// Loads an assessment for the current user.
    pub async fn open_assessment(
        &self,
        kind: AssessmentKind,
        assessment_id: &str,
    ) -> Result<AssessmentRunner, AssessmentError> {
        let token = self.session.bearer_token().await.ok_or_else(|| {
            AssessmentError::LoadFailed(ClientError::AuthFailure("Not logged in".to_string()))
        })?;

        let ctx = RunnerContext::new(self.api.clone(), self.store.clone(), token);
        AssessmentRunner::load(ctx, kind, assessment_id).await
    }

    /// Assignment submission for the current user, if logged in.
    pub async fn assignments(&self) -> Option<AssignmentClient> {
        let token = self.session.bearer_token().await?;
        Some(AssignmentClient::new(self.api.clone(), token))
    }

    /// Starts polling the unread notification count, if logged in.
    pub async fn watch_notifications(&self) -> Option<UnreadCountWatcher> {
        let token = self.session.bearer_token().await?;
        Some(UnreadCountWatcher::spawn(
            self.api.clone(),
            token,
            self.config.notification_poll_interval(),
        ))
    }

    pub async fn dispose(self) {
        self.store.close().await;
        tracing::debug!("Client state disposed");
    }
}
