// ============================
// sessiongate-backend/src/auth/provider/http.rs
// ============================
//! GoTrue-compatible REST identity provider.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use super::{
    AccountMetadata, IdentityProvider, ProviderAuth, ProviderError, ProviderSession, ProviderUser,
};

pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

// Success body of /signup and /token. /signup answers with a bare user
// object when the account still needs confirmation, hence the top-level
// `id`/`email` fallbacks.
#[derive(Debug, Deserialize)]
struct AuthBody {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    user: Option<UserBody>,
    id: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl From<UserBody> for ProviderUser {
    fn from(user: UserBody) -> Self {
        ProviderUser {
            id: user.id,
            email: user.email,
        }
    }
}

impl AuthBody {
    fn into_session(self) -> Option<ProviderSession> {
        match (self.access_token, self.refresh_token) {
            (Some(access_token), Some(refresh_token)) => Some(ProviderSession {
                access_token,
                refresh_token,
                expires_in: self.expires_in,
            }),
            _ => None,
        }
    }

    fn into_auth(mut self) -> ProviderAuth {
        let user = self.user.take().map(ProviderUser::from).or_else(|| {
            self.id.take().map(|id| ProviderUser {
                id,
                email: self.email.take(),
            })
        });
        ProviderAuth {
            user,
            session: self.into_session(),
        }
    }
}

impl HttpIdentityProvider {
    /// # Arguments
    /// * `base_url` - Root of the auth API, e.g. `https://project.supabase.co/auth/v1`
    /// * `api_key` - Sent as the `apikey` header on every call
    /// * `timeout` - Per-request timeout; there are no retries
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .error_description
            .or(body.msg)
            .or(body.message)
            .or(body.error)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        if status.is_server_error() {
            tracing::warn!(%status, %message, "identity provider error");
            Err(ProviderError::Unavailable(format!("{status}: {message}")))
        } else {
            Err(ProviderError::Rejected(message))
        }
    }

    async fn auth_call(&self, request: RequestBuilder) -> Result<AuthBody, ProviderError> {
        self.send(request)
            .await?
            .json::<AuthBody>()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("unreadable provider response: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<ProviderAuth, ProviderError> {
        let request = self.client.post(self.url("/signup")).json(&json!({
            "email": email,
            "password": password,
            "data": metadata,
        }));
        Ok(self.auth_call(request).await?.into_auth())
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAuth, ProviderError> {
        let request = self
            .client
            .post(self.url("/token?grant_type=password"))
            .json(&json!({ "email": email, "password": password }));
        Ok(self.auth_call(request).await?.into_auth())
    }

    async fn exchange_session(
        &self,
        _access_token: &str,
        refresh_token: &str,
    ) -> Result<Option<ProviderSession>, ProviderError> {
        let request = self
            .client
            .post(self.url("/token?grant_type=refresh_token"))
            .json(&json!({ "refresh_token": refresh_token }));
        Ok(self.auth_call(request).await?.into_session())
    }

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, ProviderError> {
        let request = self.client.get(self.url("/user")).bearer_auth(access_token);
        self.send(request)
            .await?
            .json::<UserBody>()
            .await
            .map(ProviderUser::from)
            .map_err(|e| ProviderError::Unavailable(format!("unreadable provider response: {e}")))
    }
}
