// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware (the gatekeeper).
//!
//! The gatekeeper runs once per request, ahead of the authorization layer
//! in [`super::policy`]. It only decides whether an [`AuthenticatedUser`]
//! is attached to the request:
//!
//! 1. Public routes pass through untouched.
//! 2. A missing or malformed `Authorization: Bearer` header passes through
//!    with no identity.
//! 3. A token that fails verification is logged and passes through with no
//!    identity.
//! 4. Otherwise the principal is loaded and the token re-checked against it;
//!    on success the identity is installed in the request extensions.
//!
//! It never produces a rejection response itself.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::principal::IdentityLoader;
use super::token::TokenService;
use super::AuthenticatedUser;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from the `Authorization` header.
///
/// Returns `None` for a missing header, a non-UTF-8 value, another scheme,
/// or an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the identity carried by `headers`, if any.
///
/// `already_authenticated` short-circuits principal loading when an earlier
/// stage has installed an identity for this request.
pub fn identify(
    tokens: &TokenService,
    loader: &dyn IdentityLoader,
    headers: &HeaderMap,
    already_authenticated: bool,
) -> Option<AuthenticatedUser> {
    let token = bearer_token(headers)?;

    let claims = match tokens.verify_and_extract_subject(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(reason = e.kind(), "Rejected bearer token");
            return None;
        }
    };

    if already_authenticated {
        return None;
    }

    let principal = match loader.load_principal(&claims.sub) {
        Ok(principal) => principal,
        Err(e) => {
            tracing::warn!(
                subject = %claims.sub,
                reason = e.kind(),
                "Could not load token subject"
            );
            return None;
        }
    };

    if !tokens.is_valid(token, &principal) {
        tracing::warn!(subject = %claims.sub, "Token not valid for loaded principal");
        return None;
    }

    Some(AuthenticatedUser::from_principal(&principal, &claims))
}

/// Gatekeeper middleware.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state
        .policy
        .is_public(request.method(), request.uri().path())
    {
        return next.run(request).await;
    }

    let already_authenticated = request.extensions().get::<AuthenticatedUser>().is_some();
    let identity = identify(
        &state.tokens,
        state.users.as_ref(),
        request.headers(),
        already_authenticated,
    );

    if let Some(user) = identity {
        tracing::debug!(user = %user.username, "Authenticated request");
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}
