// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::provider::ProviderError;
use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    /// The identity provider rejected the credentials or tokens
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The identity provider reported success without the fields it owes us
    #[error("Identity provider integrity error: {0}")]
    Integrity(String),

    #[error("Invalid session")]
    InvalidSession,

    /// No usable bearer token on the request
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token error: {0}")]
    Token(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthFailed(_)
            | AppError::Integrity(_)
            | AppError::InvalidSession
            | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Token(_) | AppError::Json(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::AuthFailed(_) => "AUTH_001",
            AppError::Integrity(_) => "AUTH_002",
            AppError::InvalidSession => "AUTH_003",
            AppError::Unauthenticated => "AUTH_004",
            AppError::Forbidden(_) => "CSRF_001",
            AppError::ProviderUnavailable(_) => "PROV_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Store(_) => "STORE_001",
            AppError::Token(_) => "TOKEN_001",
            AppError::Json(_) => "JSON_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            // Provider messages ("User already registered", ...) are meant for end users.
            AppError::AuthFailed(msg) => msg.clone(),
            AppError::Integrity(_) | AppError::InvalidSession | AppError::Unauthenticated => {
                "Authentication required".to_string()
            },
            AppError::Forbidden(_) => "Forbidden".to_string(),
            AppError::ProviderUnavailable(_) => {
                "Authentication service unavailable, please try again later".to_string()
            },
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::Store(_) | AppError::Token(_) | AppError::Json(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        }

        // Provider rejections are shown verbatim; everything else is detailed
        // in development and sanitized in production
        let message = match &self {
            AppError::AuthFailed(msg) => msg.clone(),
            _ if cfg!(debug_assertions) => self.to_string(),
            _ => self.sanitized_message(),
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(msg) => AppError::AuthFailed(msg),
            ProviderError::Unavailable(msg) => AppError::ProviderUnavailable(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Token(err.to_string())
    }
}
