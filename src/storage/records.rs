// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted account, role and prediction history records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;
use crate::prediction::{PredictionOutcome, PredictionRequest};

/// Role row in the `roles` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRole {
    /// Unique role name
    pub name: Role,
    /// Human-readable description
    pub description: String,
    /// When the role was created
    pub created_at: DateTime<Utc>,
}

impl StoredRole {
    /// Build the canonical record for a role.
    pub fn new(name: Role) -> Self {
        Self {
            name,
            description: name.description().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Account row in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Unique account identifier (UUID)
    pub id: String,
    /// Login name, unique across accounts
    pub username: String,
    /// Email address, unique across accounts
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Argon2 PHC string (may be blank on legacy or damaged records)
    pub password_hash: String,
    /// Role memberships
    pub roles: BTreeSet<Role>,
    /// Inactive accounts cannot authenticate
    pub active: bool,
    /// Outstanding password-reset token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    /// Expiry of the outstanding password-reset token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was last written
    pub updated_at: DateTime<Utc>,
}

impl StoredUser {
    /// Create a new active account with no roles.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        full_name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            full_name: full_name.into(),
            password_hash: password_hash.into(),
            roles: BTreeSet::new(),
            active: true,
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a role to the account with its role set.
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// Whether the stored credential is missing.
    pub fn has_blank_password(&self) -> bool {
        self.password_hash.trim().is_empty()
    }
}

/// One served prediction in the `predictions` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    /// Unique record identifier (UUID)
    pub id: String,
    /// Account that requested the prediction
    pub username: String,
    /// Customer identifier from the request, if any
    pub customer_id: Option<String>,
    /// Probability returned by the backend
    pub churn_probability: f64,
    /// Model input as submitted
    pub features: serde_json::Value,
    /// When the prediction was served
    pub predicted_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Record `outcome` as served to `username` for `request`.
    pub fn new(
        username: impl Into<String>,
        request: &PredictionRequest,
        outcome: &PredictionOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            customer_id: outcome.customer_id.clone(),
            churn_probability: outcome.churn_probability,
            features: request.features.clone(),
            predicted_at: Utc::now(),
        }
    }
}
