// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StoreError;

/// Reasons a bearer token fails verification.
///
/// Callers may log the kind, but access control treats every kind the same:
/// the request carries no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Token cannot be parsed or carries unexpected claims
    #[error("token is malformed")]
    Malformed,
    /// Token expiry is not in the future
    #[error("token has expired")]
    Expired,
    /// Token signature does not match the signing key
    #[error("token signature is invalid")]
    BadSignature,
}

impl TokenError {
    /// Stable identifier used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed => "token_malformed",
            TokenError::Expired => "token_expired",
            TokenError::BadSignature => "token_bad_signature",
        }
    }
}

/// Authentication error type.
///
/// Clients only ever see two shapes of authentication failure:
/// `authentication_required` (401) and `insufficient_permissions` (403).
/// The precise reason a token was refused stays in the server logs.
#[derive(Debug)]
pub enum AuthError {
    /// No identity is attached to the request
    MissingAuthentication,
    /// Token failed verification
    InvalidToken(TokenError),
    /// Token subject does not resolve to an account
    IdentityNotFound,
    /// Token subject resolves to a deactivated account
    IdentityInactive,
    /// Username/password pair was rejected
    InvalidCredentials,
    /// Identity present but lacks the required role
    InsufficientPermissions,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the client-facing error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthentication
            | AuthError::InvalidToken(_)
            | AuthError::IdentityNotFound
            | AuthError::IdentityInactive => "authentication_required",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the server-side reason for this error, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingAuthentication => "missing_authentication",
            AuthError::InvalidToken(e) => e.kind(),
            AuthError::IdentityNotFound => "identity_not_found",
            AuthError::IdentityInactive => "identity_inactive",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthentication
            | AuthError::InvalidToken(_)
            | AuthError::IdentityNotFound
            | AuthError::IdentityInactive
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingAuthentication
            | AuthError::InvalidToken(_)
            | AuthError::IdentityNotFound
            | AuthError::IdentityInactive => "Authentication is required",
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::InsufficientPermissions => "Insufficient permissions for this operation",
            AuthError::InternalError(_) => "Internal authentication error",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthentication => {
                write!(f, "Request carries no authenticated identity")
            }
            AuthError::InvalidToken(e) => write!(f, "Bearer token rejected: {e}"),
            AuthError::IdentityNotFound => write!(f, "Token subject does not match any account"),
            AuthError::IdentityInactive => {
                write!(f, "Token subject belongs to an inactive account")
            }
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::InvalidToken(err)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.public_message().to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthentication.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "authentication_required");
    }

    #[tokio::test]
    async fn token_failure_kind_is_not_exposed() {
        let response = AuthError::InvalidToken(TokenError::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(!body.contains("expired"));
        assert!(body.contains("authentication_required"));
    }

    #[tokio::test]
    async fn insufficient_permissions_returns_403() {
        let response = AuthError::InsufficientPermissions.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn kinds_distinguish_token_failures() {
        assert_eq!(AuthError::from(TokenError::Malformed).kind(), "token_malformed");
        assert_eq!(AuthError::from(TokenError::Expired).kind(), "token_expired");
        assert_eq!(AuthError::from(TokenError::BadSignature).kind(), "token_bad_signature");
    }
}
