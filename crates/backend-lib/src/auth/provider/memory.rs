// ============================
// sessiongate-backend/src/auth/provider/memory.rs
// ============================
//! In-process identity provider for local development and tests.
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

use super::{
    AccountMetadata, IdentityProvider, ProviderAuth, ProviderError, ProviderSession, ProviderUser,
};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token_generator::generate_secure_token;

/// Lifetime the memory provider advertises for its access tokens
const ACCESS_TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    username: String,
    password_hash: String,
}

/// Accounts and opaque provider tokens kept in memory.
///
/// Refresh tokens are single use: exchanging one revokes it together with
/// the access token it was paired with.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    /// Keyed by normalized email
    accounts: DashMap<String, Account>,
    /// access token -> user id
    access_tokens: DashMap<String, String>,
    /// refresh token -> (user id, paired access token)
    refresh_tokens: DashMap<String, (String, String)>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_session(&self, user_id: &str) -> ProviderSession {
        let access_token = generate_secure_token();
        let refresh_token = generate_secure_token();
        self.access_tokens
            .insert(access_token.clone(), user_id.to_string());
        self.refresh_tokens.insert(
            refresh_token.clone(),
            (user_id.to_string(), access_token.clone()),
        );
        ProviderSession {
            access_token,
            refresh_token,
            expires_in: Some(ACCESS_TOKEN_TTL_SECS),
        }
    }

    fn user_by_id(&self, user_id: &str) -> Option<ProviderUser> {
        self.accounts
            .iter()
            .find(|entry| entry.value().id == user_id)
            .map(|entry| ProviderUser {
                id: entry.value().id.clone(),
                email: Some(entry.value().email.clone()),
            })
    }

    /// Username recorded at signup
    pub fn username_of(&self, user_id: &str) -> Option<String> {
        self.accounts
            .iter()
            .find(|entry| entry.value().id == user_id)
            .map(|entry| entry.value().username.clone())
    }

    /// Invalidate every provider token held for `user_id`
    pub fn revoke_user(&self, user_id: &str) {
        self.access_tokens.retain(|_, owner| owner != user_id);
        self.refresh_tokens.retain(|_, (owner, _)| owner != user_id);
        tracing::info!(user_id, "revoked provider tokens");
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<ProviderAuth, ProviderError> {
        let email = normalize_email(email);
        if self.accounts.contains_key(&email) {
            return Err(ProviderError::Rejected("User already registered".to_string()));
        }

        let plain = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain))
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let account = match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => {
                return Err(ProviderError::Rejected("User already registered".to_string()));
            },
            Entry::Vacant(slot) => slot
                .insert(Account {
                    id: Uuid::new_v4().to_string(),
                    email,
                    username: metadata.username.clone(),
                    password_hash,
                })
                .clone(),
        };

        let session = self.issue_session(&account.id);
        Ok(ProviderAuth {
            user: Some(ProviderUser {
                id: account.id,
                email: Some(account.email),
            }),
            session: Some(session),
        })
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAuth, ProviderError> {
        let invalid = || ProviderError::Rejected("Invalid login credentials".to_string());

        let account = self
            .accounts
            .get(&normalize_email(email))
            .map(|entry| entry.value().clone())
            .ok_or_else(invalid)?;

        let hash = account.password_hash.clone();
        let plain = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &plain))
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        if !matches {
            return Err(invalid());
        }

        let session = self.issue_session(&account.id);
        Ok(ProviderAuth {
            user: Some(ProviderUser {
                id: account.id,
                email: Some(account.email),
            }),
            session: Some(session),
        })
    }

    async fn exchange_session(
        &self,
        _access_token: &str,
        refresh_token: &str,
    ) -> Result<Option<ProviderSession>, ProviderError> {
        let (_, (user_id, paired_access)) = self.refresh_tokens.remove(refresh_token).ok_or_else(|| {
            ProviderError::Rejected("Invalid Refresh Token: Refresh Token Not Found".to_string())
        })?;
        self.access_tokens.remove(&paired_access);
        Ok(Some(self.issue_session(&user_id)))
    }

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, ProviderError> {
        let user_id = self
            .access_tokens
            .get(access_token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ProviderError::Rejected("invalid JWT".to_string()))?;
        self.user_by_id(&user_id)
            .ok_or_else(|| ProviderError::Rejected("User not found".to_string()))
    }
}
