// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and authenticated user representation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::principal::Principal;
use super::roles::Role;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated user information installed by the gatekeeper.
///
/// This is the primary type used throughout the application to represent
/// the identity making a request. It lives in the request's extensions and
/// is dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Account username (token `sub` claim)
    pub username: String,

    /// Roles held by the account when the request was authenticated
    pub roles: BTreeSet<Role>,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build the request identity from a verified token and its principal.
    pub fn from_principal(principal: &Principal, claims: &TokenClaims) -> Self {
        Self {
            username: principal.username.clone(),
            roles: principal.roles.clone(),
            expires_at: claims.exp,
        }
    }

    /// Role-derived authorities (`ROLE_ADMIN`, `ROLE_ANALYST`).
    pub fn authorities(&self) -> Vec<String> {
        self.roles.iter().map(Role::authority).collect()
    }

    /// Check if the user holds exactly the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.roles.contains(&required)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Highest-ranked role held.
    pub fn primary_role(&self) -> Option<Role> {
        self.roles.iter().min().copied()
    }
}
