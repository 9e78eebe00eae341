// src/session/mod.rs

//! Session Manager: the single source of truth for who the current user is and
//! what they may reach.
//!
//! State machine: `Anonymous --authenticate--> Authenticated --end_session--> Anonymous`.
//! Students additionally carry an approval sub-state reported by the server.

use std::sync::Arc;

use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    api::AuthApi,
    error::ClientError,
    models::user::{ChildSummary, Credentials, LoginResponse, Profile, RegisterRequest, Role},
    storage::{KeyValueStore, keys},
    utils::{
        clock::{Clock, SystemClock},
        jwt,
    },
};

pub mod route;

pub use route::{Capability, RouteDecision, RouteTarget};

/// Authenticated identity. An empty `token` means anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub role: Option<Role>,
    pub token: String,
    /// Only meaningful for students.
    pub approved: bool,
    /// Linked children, parent accounts only.
    pub children: Vec<ChildSummary>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn is_pending_approval(&self) -> bool {
        self.is_authenticated() && self.role == Some(Role::Student) && !self.approved
    }

    fn from_login(resp: LoginResponse) -> Self {
        Self {
            user_id: Some(resp.user.id),
            user_name: Some(resp.user.name),
            role: Some(resp.user.role),
            token: resp.token,
            approved: resp.user.is_approved.unwrap_or(false),
            children: resp.children.unwrap_or_default(),
        }
    }
}

fn approved_flag(value: Option<&str>) -> bool {
    value == Some("true")
}

pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    session: RwLock<Session>,
}

impl SessionManager {
    /// Anonymous manager; call `restore_from_storage` to hydrate.
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(api, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        api: Arc<dyn AuthApi>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            store,
            clock,
            session: RwLock::new(Session::default()),
        }
    }

    /// Constructs the manager and hydrates it from durable storage.
    pub async fn init(
        api: Arc<dyn AuthApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let manager = Self::new(api, store);
        manager.restore_from_storage().await?;
        Ok(manager)
    }

    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn bearer_token(&self) -> Option<String> {
        let session = self.session.read().await;
        session
            .is_authenticated()
            .then(|| session.token.clone())
    }

    /// Hydrates the in-memory session from storage.
    ///
    /// A record missing any of token, user id, user name or role is treated as
    /// absent. A JWT whose `exp` already passed ends the stored session.
    pub async fn restore_from_storage(&self) -> Result<(), ClientError> {
        let token = self.store.get(keys::TOKEN).await?.unwrap_or_default();
        let user_id = self.store.get(keys::USER_ID).await?;
        let user_name = self.store.get(keys::USER_NAME).await?;
        let role = self.store.get(keys::ROLE).await?;

        let restored = match (token.is_empty(), user_id, user_name, role) {
            (false, Some(user_id), Some(user_name), Some(role)) => match role.parse::<Role>() {
                Ok(role) => Some(Session {
                    user_id: Some(user_id),
                    user_name: Some(user_name),
                    role: Some(role),
                    token,
                    approved: approved_flag(self.store.get(keys::IS_APPROVED).await?.as_deref()),
                    children: self.restore_children().await,
                }),
                Err(e) => {
                    tracing::warn!("Ignoring stored session with invalid role: {}", e);
                    None
                }
            },
            (false, ..) => {
                tracing::warn!("Ignoring partially stored session");
                None
            }
            _ => None,
        };

        let Some(session) = restored else {
            *self.session.write().await = Session::default();
            return Ok(());
        };

        if jwt::is_expired(&session.token, self.clock.now_millis()) {
            tracing::info!("Stored session token expired, ending session");
            return self.end_session().await;
        }

        tracing::info!(
            user_id = ?session.user_id,
            role = ?session.role,
            "Session restored from storage"
        );
        *self.session.write().await = session;
        Ok(())
    }

    async fn restore_children(&self) -> Vec<ChildSummary> {
        match self.store.get(keys::CHILDREN).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable children list: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read children list: {}", e);
                Vec::new()
            }
        }
    }

    /// Logs in and commits the whole session, or nothing.
    ///
    /// Storage is written in one batch before the in-memory session changes, so
    /// a failure at any step leaves the previous state observable.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        credentials.validate()?;

        let response = self.api.login(credentials).await.map_err(|e| {
            tracing::warn!("Login failed for {}: {}", credentials.email, e);
            e
        })?;

        if response.token.is_empty() {
            return Err(ClientError::MalformedResponse(
                "login response carried an empty token".to_string(),
            ));
        }

        let session = Session::from_login(response);
        self.persist(&session).await?;

        tracing::info!(
            user_id = ?session.user_id,
            role = ?session.role,
            "User authenticated"
        );
        *self.session.write().await = session.clone();
        Ok(session)
    }

    async fn persist(&self, session: &Session) -> Result<(), ClientError> {
        // Children are always written so a previous parent's list cannot survive.
        let entries: Vec<(&str, String)> = vec![
            (keys::TOKEN, session.token.clone()),
            (keys::USER_ID, session.user_id.clone().unwrap_or_default()),
            (keys::USER_NAME, session.user_name.clone().unwrap_or_default()),
            (
                keys::ROLE,
                session.role.map(|r| r.as_str().to_string()).unwrap_or_default(),
            ),
            (keys::IS_APPROVED, session.approved.to_string()),
            (keys::CHILDREN, serde_json::to_string(&session.children)?),
        ];

        self.store.set_many(&entries).await
    }

    /// Clears every session field in memory and in storage. Idempotent.
    pub async fn end_session(&self) -> Result<(), ClientError> {
        let mut session = self.session.write().await;
        self.store.remove_many(&keys::SESSION_KEYS).await?;
        if session.is_authenticated() {
            tracing::info!(user_id = ?session.user_id, "Session ended");
        }
        *session = Session::default();
        Ok(())
    }

    /// Decides whether `capability` is reachable right now.
    ///
    /// The approval flag is re-read from storage on every call since an admin
    /// may approve the account out of band.
    pub async fn authorize_route(&self, capability: Capability) -> Result<RouteDecision, ClientError> {
        let approved = approved_flag(self.store.get(keys::IS_APPROVED).await?.as_deref());

        let mut session = self.session.write().await;
        if session.is_authenticated() {
            session.approved = approved;
        }
        let decision = route::authorize(&session, capability);

        tracing::debug!(?capability, ?decision, "Route authorization");
        Ok(decision)
    }

    /// Asks the server for the current approval status and persists it.
    pub async fn refresh_approval(&self) -> Result<bool, ClientError> {
        let profile = self.fetch_profile().await?;
        let approved = profile.is_approved.unwrap_or(false);

        self.store
            .set(keys::IS_APPROVED, &approved.to_string())
            .await?;
        self.session.write().await.approved = approved;
        Ok(approved)
    }

    pub async fn fetch_profile(&self) -> Result<Profile, ClientError> {
        let token = self.require_token().await?;
        self.api.fetch_profile(&token).await
    }

    /// Updates the display name server-side; on 200 the stored name follows.
    pub async fn update_display_name(&self, name: &str) -> Result<u16, ClientError> {
        let token = self.require_token().await?;
        if name.trim().is_empty() {
            return Err(ClientError::ValidationFailure(
                "Name must not be empty.".to_string(),
            ));
        }

        let status = self.api.update_profile_name(&token, name).await?;
        if status == 200 {
            self.store.set(keys::USER_NAME, name).await?;
            self.session.write().await.user_name = Some(name.to_string());
        }
        Ok(status)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<u16, ClientError> {
        request.validate()?;
        self.api.register(request).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<u16, ClientError> {
        self.api.forgot_password(email).await
    }

    pub async fn reset_password(&self, reset_token: &str, password: &str) -> Result<u16, ClientError> {
        self.api.reset_password(reset_token, password).await
    }

    async fn require_token(&self) -> Result<String, ClientError> {
        self.bearer_token()
            .await
            .ok_or_else(|| ClientError::AuthFailure("Not logged in".to_string()))
    }
}
