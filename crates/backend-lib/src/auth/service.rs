// ============================
// sessiongate-backend/src/auth/service.rs
// ============================
//! Session lifecycle: login/signup, refresh, logout, and the bearer-token
//! validation path shared by the HTTP guard and the real-time handshake.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::provider::{AccountMetadata, IdentityProvider, ProviderAuth, ProviderUser};
use super::session::{ClientInfo, Session};
use super::token::{DecodeError, TokenIssuer};
use crate::error::AppError;
use crate::metrics::{SESSION_CREATED, SESSION_DESTROYED, SESSION_REFRESHED, SESSION_TOUCH_FAILED};
use crate::storage::{SessionStore, StoreError};

/// What a successful login or signup hands back to the HTTP layer
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub token: String,
    pub csrf_token: String,
    pub user_id: String,
    pub session_id: String,
}

/// Why a bearer token did not resolve to a session. Only ever logged:
/// callers of `validate_session` see a uniform `None`.
#[derive(Debug, Error)]
enum Rejection {
    #[error("token rejected: {0}")]
    Token(#[from] DecodeError),
    #[error("token lacks a session or user claim")]
    MissingClaims,
    #[error("no live session")]
    UnknownSession,
    #[error("token subject does not own the session")]
    SubjectMismatch,
    #[error("session store failed: {0}")]
    Store(#[from] StoreError),
}

/// Orchestrates the identity provider, the session store and the token issuer
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    tokens: TokenIssuer,
    session_ttl: Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        tokens: TokenIssuer,
        session_ttl: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            tokens,
            session_ttl,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Create an account with the provider and open a session for it
    pub async fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<AuthOutcome, AppError> {
        let metadata = AccountMetadata {
            username: username.to_string(),
        };
        let auth = self
            .provider
            .create_account(email, password, &metadata)
            .await?;
        self.establish(auth, client).await
    }

    /// Verify credentials with the provider and open a session
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<AuthOutcome, AppError> {
        let auth = self.provider.verify_credentials(email, password).await?;
        self.establish(auth, client).await
    }

    async fn establish(&self, auth: ProviderAuth, client: ClientInfo) -> Result<AuthOutcome, AppError> {
        let user = auth
            .user
            .ok_or_else(|| AppError::Integrity("provider returned no user".to_string()))?;
        let provider_session = auth
            .session
            .ok_or_else(|| AppError::Integrity("provider returned no session".to_string()))?;

        let session = Session::new(user.id, provider_session, client);
        self.store
            .set(&session.session_id, &session, self.session_ttl)
            .await?;
        let token = self.tokens.issue(&session.session_id, &session.user_id)?;

        counter!(SESSION_CREATED).increment(1);
        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            "session created"
        );

        Ok(AuthOutcome {
            token,
            csrf_token: session.csrf_token,
            user_id: session.user_id,
            session_id: session.session_id,
        })
    }

    /// Destroy a session. Idempotent; the provider is not contacted.
    pub async fn logout(&self, session_id: &str) -> Result<(), AppError> {
        self.store.delete(session_id).await?;
        counter!(SESSION_DESTROYED).increment(1);
        tracing::info!(session_id, "session destroyed");
        Ok(())
    }

    /// Rotate the provider tokens of a session and mint a new bearer token for
    /// the same session id.
    ///
    /// Concurrent refreshes of one session are not fenced; the last write wins.
    /// A logout that lands while the provider call is in flight wins over the
    /// refresh, which then fails with `InvalidSession`.
    pub async fn refresh(&self, session_id: &str) -> Result<String, AppError> {
        let mut session = self
            .store
            .get(session_id)
            .await?
            .ok_or(AppError::InvalidSession)?;

        let renewed = self
            .provider
            .exchange_session(&session.provider_access_token, &session.provider_refresh_token)
            .await?
            .ok_or_else(|| AppError::Integrity("provider refresh returned no session".to_string()))?;

        session.rotate_provider_tokens(renewed, Utc::now());
        let replaced = self
            .store
            .replace(&session.session_id, &session, self.session_ttl)
            .await?;
        if !replaced {
            tracing::info!(session_id = %session.session_id, "session ended during refresh");
            return Err(AppError::InvalidSession);
        }
        let token = self.tokens.issue(&session.session_id, &session.user_id)?;

        counter!(SESSION_REFRESHED).increment(1);
        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            "session refreshed"
        );
        Ok(token)
    }

    /// Live identity from the provider, using the session's access token
    pub async fn get_user_from_session(&self, session_id: &str) -> Result<ProviderUser, AppError> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or(AppError::InvalidSession)?;
        Ok(self.provider.get_user(&session.provider_access_token).await?)
    }

    /// Every live session of a user, for audit listings
    pub async fn list_user_sessions(&self, user_id: &str) -> Result<Vec<Session>, AppError> {
        let mut sessions = self.store.list_by_user(user_id).await?;
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(sessions)
    }

    /// Resolve a bearer token to its session, or `None` for any problem at all.
    /// On success the session's liveness is extended in the background.
    pub async fn validate_session(&self, token: &str) -> Option<Session> {
        match self.authenticate(token).await {
            Ok(mut session) => {
                let now = Utc::now();
                self.spawn_liveness_touch(&session.session_id);
                session.last_activity = now;
                Some(session)
            },
            Err(reason) => {
                tracing::debug!(%reason, "bearer token rejected");
                None
            },
        }
    }

    async fn authenticate(&self, token: &str) -> Result<Session, Rejection> {
        let claims = self.tokens.verify(token)?;
        let (Some(session_id), Some(user_id)) = (claims.sid, claims.sub) else {
            return Err(Rejection::MissingClaims);
        };
        let session = self
            .store
            .get(&session_id)
            .await?
            .ok_or(Rejection::UnknownSession)?;
        if session.user_id != user_id {
            return Err(Rejection::SubjectMismatch);
        }
        Ok(session)
    }

    /// Lenient resolution for the refresh endpoint: the token must carry our
    /// signature, but may be expired.
    pub async fn authorize_refresh(&self, token: &str) -> Result<Session, AppError> {
        let claims = self.tokens.decode(token).map_err(|e| {
            tracing::debug!(reason = %e, "refresh token rejected");
            AppError::Unauthenticated
        })?;
        let session_id = claims.sid.ok_or(AppError::Unauthenticated)?;
        let session = self
            .store
            .get(&session_id)
            .await?
            .ok_or(AppError::InvalidSession)?;
        if claims.sub.is_some_and(|sub| sub != session.user_id) {
            return Err(AppError::Unauthenticated);
        }
        Ok(session)
    }

    /// Best-effort `last_activity` update. Runs detached; a failure is logged
    /// and counted, never reported to the request that triggered it.
    pub fn spawn_liveness_touch(&self, session_id: &str) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let session_id = session_id.to_string();
        let ttl = self.session_ttl;
        tokio::spawn(async move {
            match store.touch(&session_id, Utc::now(), ttl).await {
                Ok(true) => {},
                Ok(false) => tracing::debug!(%session_id, "session vanished before touch"),
                Err(e) => {
                    counter!(SESSION_TOUCH_FAILED).increment(1);
                    tracing::warn!(%session_id, error = %e, "failed to record session activity");
                },
            }
        })
    }
}
