/*
 * Responsibility
 * - The single authorization error shape shared by parser / verifier / permission checker
 * - IntoResponse implementation (HTTP status / JSON error body)
 * - Conversion from key set errors (JWKS); jsonwebtoken errors are classified by the verifier
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::jwks::JwksError;

/// Machine-readable error codes. Each code owns exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    AuthorizationHeaderMissing,
    InvalidHeader,
    TokenExpired,
    InvalidClaims,
    Unauthorized,
    JwksUnreachable,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationHeaderMissing => "authorization_header_missing",
            Self::InvalidHeader => "invalid_header",
            Self::TokenExpired => "token_expired",
            Self::InvalidClaims => "invalid_claims",
            Self::Unauthorized => "unauthorized",
            Self::JwksUnreachable => "jwks_unreachable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthorizationHeaderMissing | Self::InvalidHeader | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::InvalidClaims => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::JwksUnreachable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthErrorBody {
    pub code: AuthErrorCode,
    pub description: String,
}

/// Wire body: `{"error": {"code": ..., "description": ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub error: &'a AuthErrorBody,
}

/// Authorization failure.
///
/// Fields are private: once built, an error is passed through untouched
/// until the boundary renders it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {}", error.code.as_str(), error.description)]
pub struct AuthError {
    status_code: StatusCode,
    error: AuthErrorBody,
}

impl AuthError {
    fn new(code: AuthErrorCode, description: impl Into<String>) -> Self {
        Self {
            status_code: code.status(),
            error: AuthErrorBody {
                code,
                description: description.into(),
            },
        }
    }

    pub fn header_missing() -> Self {
        Self::new(
            AuthErrorCode::AuthorizationHeaderMissing,
            "Authorization header is expected.",
        )
    }

    pub fn invalid_header(description: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidHeader, description)
    }

    pub fn token_expired() -> Self {
        Self::new(AuthErrorCode::TokenExpired, "Token expired.")
    }

    pub fn invalid_claims(description: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidClaims, description)
    }

    pub fn unauthorized() -> Self {
        Self::new(AuthErrorCode::Unauthorized, "Permission not found.")
    }

    pub fn jwks_unreachable(description: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::JwksUnreachable, description)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn code(&self) -> AuthErrorCode {
        self.error.code
    }

    pub fn description(&self) -> &str {
        &self.error.description
    }

    pub fn body(&self) -> &AuthErrorBody {
        &self.error
    }
}

impl From<JwksError> for AuthError {
    fn from(err: JwksError) -> Self {
        match err {
            JwksError::Unreachable(reason) => {
                tracing::warn!(reason = %reason, "signing keys unavailable");
                Self::jwks_unreachable("Unable to fetch signing keys.")
            }
            JwksError::KeyNotFound(_) => Self::invalid_header("Unable to find the appropriate key."),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse { error: &self.error };
        (self.status_code, Json(body)).into_response()
    }
}
