// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public account endpoints: login, registration, password reset and token
//! validation.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::middleware::bearer_token;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthError, IdentityLoader, Principal, Role};
use crate::config::RESET_TOKEN_LIFETIME_HOURS;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{CredentialStore, StoredUser};

const MIN_USERNAME_LEN: usize = 4;
const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub username: String,
    /// Role-derived authorities (`ROLE_ADMIN`, `ROLE_ANALYST`)
    pub authorities: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(alias = "fullName")]
    pub full_name: String,
}

impl RegisterRequest {
    /// Strip surrounding whitespace from every field except the password.
    fn trimmed(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            password: self.password,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForgotPasswordResponse {
    /// Reset token. Returned directly since no mail transport is configured.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub username: String,
}

// =============================================================================
// Validation
// =============================================================================

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.username.chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    validate_password(&req.password)?;
    if !req.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if req.full_name.is_empty() {
        return Err(ApiError::bad_request("Full name is required"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Exchange a username (or email) and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let user = state.users.find_user_by_login(&req.username)?;

    let principal: Principal = match user {
        Some(user) if user.active && verify_password(&user.password_hash, &req.password) => {
            user.into()
        }
        _ => {
            tracing::info!(login = %req.username, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }
    };

    let issued = state.tokens.issue(&principal)?;
    tracing::info!(user = %principal.username, "Login succeeded");

    Ok(Json(LoginResponse {
        token: issued.token,
        authorities: principal.roles.iter().map(Role::authority).collect(),
        username: principal.username,
        expires_at: issued.expires_at,
    }))
}

/// Create an analyst account.
///
/// Username, email and full name are trimmed before they are validated and
/// stored.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Username or email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let req = req.trimmed();
    validate_registration(&req)?;

    let user = StoredUser::new(
        req.username,
        req.email,
        req.full_name,
        hash_password(&req.password)?,
    )
    .with_role(Role::Analyst);

    let mut txn = state.users.begin()?;
    txn.create_user(&user)?;
    txn.commit()?;

    tracing::info!(user = %user.username, "Registered account");
    Ok(Json(RegisterResponse {
        username: user.username,
        role: Role::Analyst,
    }))
}

/// Issue a password-reset token for the account with the given email.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset token issued", body = ForgotPasswordResponse),
        (status = 404, description = "No account with that email")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let mut txn = state.users.begin()?;
    let Some(mut user) = txn.find_user_by_email(req.email.trim())? else {
        txn.abort()?;
        return Err(ApiError::not_found("No account is registered with that email"));
    };

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_LIFETIME_HOURS);
    user.reset_token = Some(token.clone());
    user.reset_token_expiry = Some(expires_at);
    txn.update_user(&user)?;
    txn.commit()?;

    tracing::info!(user = %user.username, "Issued password reset token");
    Ok(Json(ForgotPasswordResponse { token, expires_at }))
}

/// Replace the password of the account holding a reset token.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or weak password")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password(&req.new_password)?;

    let mut txn = state.users.begin()?;
    let Some(mut user) = txn.find_user_by_reset_token(&req.token)? else {
        txn.abort()?;
        return Err(ApiError::bad_request("Invalid reset token"));
    };

    let expired = user.reset_token_expiry.is_none_or(|expiry| expiry <= Utc::now());
    if expired {
        txn.abort()?;
        return Err(ApiError::bad_request("Reset token has expired"));
    }

    user.password_hash = hash_password(&req.new_password)?;
    user.reset_token = None;
    user.reset_token_expiry = None;
    txn.update_user(&user)?;
    txn.commit()?;

    tracing::info!(user = %user.username, "Password reset");
    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

/// Check the bearer token on this request.
#[utoipa::path(
    get,
    path = "/api/auth/validate",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid", body = ValidateResponse),
        (status = 401, description = "Token missing or invalid")
    )
)]
pub async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ValidateResponse>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingAuthentication)?;
    let claims = state.tokens.verify_and_extract_subject(token)?;
    let principal = state.users.load_principal(&claims.sub)?;

    if !state.tokens.is_valid(token, &principal) {
        return Err(AuthError::MissingAuthentication);
    }

    Ok(Json(ValidateResponse {
        username: principal.username,
    }))
}
