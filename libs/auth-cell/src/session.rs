// libs/auth-cell/src/session.rs
//! Auth session context.
//!
//! The signed-in session is an explicit [`AuthContext`] value built by
//! [`AuthContext::hydrate`] and torn down by [`AuthContext::clear`]. There is
//! no process-wide singleton; whoever needs the session is handed the context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use shared_backend::{BackendClient, BackendError};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_utils::jwt;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Session has no refresh token")]
    NoRefreshToken,

    #[error("Token refresh rejected ({status}): {message}")]
    RefreshRejected { status: u16, message: String },

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Session store error: {0}")]
    Store(#[from] std::io::Error),

    #[error("Stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Sessions without an expiry never expire locally.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: Option<String>,
    /// Lifetime of the new access token, in seconds.
    expires_in: Option<i64>,
    user: Option<User>,
}

/// `exp` claim of a JWT access token, read without verification.
fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let claims = jwt::decode_claims(access_token).ok()?;
    let exp = i64::try_from(claims.exp?).ok()?;
    Utc.timestamp_opt(exp, 0).single()
}

/// Persistence for the signed-in session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<AuthSession>, AuthError>;

    async fn save(&self, session: &AuthSession) -> Result<(), AuthError>;

    async fn remove(&self) -> Result<(), AuthError>;
}

/// Session kept as a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `SESSION_STORE_PATH`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.session_store_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<AuthSession>, AuthError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&self, session: &AuthSession) -> Result<(), AuthError> {
        let contents = serde_json::to_string_pretty(session)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, contents).await?;

        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn remove(&self) -> Result<(), AuthError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<AuthSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &AuthSession) -> Result<(), AuthError> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<(), AuthError> {
        self.session.write().await.take();
        Ok(())
    }
}

pub struct AuthContext {
    store: Arc<dyn SessionStore>,
    session: RwLock<Option<AuthSession>>,
}

impl AuthContext {
    /// Loads the persisted session. An unreadable file is discarded and the
    /// context starts signed out.
    pub async fn hydrate(store: Arc<dyn SessionStore>) -> Result<Self, AuthError> {
        let session = match store.load().await {
            Ok(session) => session,
            Err(AuthError::Corrupt(e)) => {
                warn!("Discarding unreadable stored session: {}", e);
                store.remove().await?;
                None
            }
            Err(e) => return Err(e),
        };

        match &session {
            Some(session) => info!("Restored session for user {}", session.user.id),
            None => debug!("No stored session"),
        }

        Ok(Self {
            store,
            session: RwLock::new(session),
        })
    }

    pub async fn set_session(&self, session: AuthSession) -> Result<(), AuthError> {
        self.store.save(&session).await?;
        *self.session.write().await = Some(session);
        Ok(())
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.as_ref().map(|session| session.user.clone())
    }

    /// Access token of a live session; `None` once it has expired.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .filter(|session| !session.is_expired_at(Utc::now()))
            .map(|session| session.access_token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_some()
    }

    /// Exchanges the refresh token for a new access token and persists the result.
    #[instrument(skip(self, client))]
    pub async fn refresh(&self, client: &BackendClient) -> Result<AuthSession, AuthError> {
        let current = self.session.read().await.clone().ok_or(AuthError::NotAuthenticated)?;
        let refresh_token = current.refresh_token.clone().ok_or(AuthError::NoRefreshToken)?;

        let response: RefreshResponse = client
            .post(
                "/api/v1/auth/refresh",
                None,
                Some(json!({ "refreshToken": refresh_token })),
            )
            .await
            .map_err(|err| match err.downcast_ref::<BackendError>() {
                Some(backend) => AuthError::RefreshRejected {
                    status: backend.status,
                    message: backend.message.clone(),
                },
                None => AuthError::Refresh(err.to_string()),
            })?;

        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs))
            .or_else(|| token_expiry(&response.access_token));

        let refreshed = AuthSession {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(current.refresh_token),
            user: response.user.unwrap_or(current.user),
            expires_at,
        };

        self.set_session(refreshed.clone()).await?;
        info!("Refreshed session for user {}", refreshed.user.id);
        Ok(refreshed)
    }

    /// Signs out: forgets the session and removes it from the store.
    pub async fn clear(&self) -> Result<(), AuthError> {
        self.session.write().await.take();
        self.store.remove().await?;
        info!("Session cleared");
        Ok(())
    }
}
