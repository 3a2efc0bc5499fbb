// ============================
// sessiongate-backend/src/auth/provider/mod.rs
// ============================
//! The upstream identity provider seam.
//!
//! The provider performs the actual credential checks and owns the
//! provider-side access/refresh tokens; this crate only stores them inside a
//! [`Session`](super::Session) and wraps them in its own bearer token.

mod http;
mod memory;

pub use http::HttpIdentityProvider;
pub use memory::MemoryIdentityProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    pub email: Option<String>,
}

/// Provider-side credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSession")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Result of account creation or credential verification.
///
/// A success missing either field is a provider contract violation, which
/// the session manager reports separately from a rejection.
#[derive(Debug, Clone, Default)]
pub struct ProviderAuth {
    pub user: Option<ProviderUser>,
    pub session: Option<ProviderSession>,
}

/// Extra data stored with a new account
#[derive(Debug, Clone, Serialize)]
pub struct AccountMetadata {
    pub username: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the credentials or tokens; the message is user-facing
    #[error("{0}")]
    Rejected(String),
    /// Transport failure, timeout, or provider-side 5xx
    #[error("{0}")]
    Unavailable(String),
}

/// The four provider operations the session manager consumes
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<ProviderAuth, ProviderError>;

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAuth, ProviderError>;

    /// Trade the stored tokens for fresh ones. `Ok(None)` is a success
    /// response that carried no session.
    async fn exchange_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Option<ProviderSession>, ProviderError>;

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, ProviderError>;
}
