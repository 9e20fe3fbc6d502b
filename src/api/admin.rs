// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AdminOnly, Role};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::StoredUser;

/// Account summary. Never carries the credential hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<Role>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<StoredUser> for UserSummary {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            roles: user.roles.into_iter().collect(),
            active: user.active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total: usize,
}

/// List all accounts (admin only).
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All accounts", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
) -> Result<Json<UserListResponse>, ApiError> {
    tracing::debug!(admin = %admin.username, "Listing accounts");
    let users: Vec<UserSummary> = state
        .users
        .list_users()?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}
