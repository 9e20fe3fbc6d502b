// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedUser, Role};

/// Response for GET /api/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Account username
    pub username: String,
    /// Roles held
    pub roles: Vec<Role>,
    /// Role-derived authorities
    pub authorities: Vec<String>,
    /// Highest-ranked role, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_role: Option<Role>,
}

impl From<AuthenticatedUser> for UserMeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            authorities: user.authorities(),
            primary_role: user.primary_role(),
            roles: user.roles.into_iter().collect(),
            username: user.username,
        }
    }
}

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<UserMeResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn user_me_response_from_authenticated_user() {
        let user = AuthenticatedUser {
            username: "admin".to_string(),
            roles: BTreeSet::from([Role::Analyst, Role::Admin]),
            expires_at: 0,
        };

        let response: UserMeResponse = user.into();
        assert_eq!(response.username, "admin");
        assert_eq!(response.roles, vec![Role::Admin, Role::Analyst]);
        assert_eq!(response.authorities, vec!["ROLE_ADMIN", "ROLE_ANALYST"]);
        assert_eq!(response.primary_role, Some(Role::Admin));
    }
}
