// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// The set is closed: both roles are created by the bootstrap reconciler
/// before the service accepts traffic.
///
/// ## Roles
///
/// - `Admin` - Full access, including administrative and reporting endpoints
/// - `Analyst` - Standard user, can run predictions and read own data
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Standard analyst
    Analyst,
}

impl Role {
    /// Every role the system requires, in creation order.
    pub const ALL: [Role; 2] = [Role::Admin, Role::Analyst];

    /// Stored role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Analyst => "ANALYST",
        }
    }

    /// Granted authority derived from this role (`ROLE_<NAME>`).
    pub fn authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }

    /// Human-readable description stored alongside the role.
    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator with full access",
            Role::Analyst => "Standard analyst user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_is_prefixed() {
        assert_eq!(Role::Admin.authority(), "ROLE_ADMIN");
        assert_eq!(Role::Analyst.authority(), "ROLE_ANALYST");
    }

    #[test]
    fn serializes_as_uppercase_name() {
        assert_eq!(serde_json::to_string(&Role::Analyst).unwrap(), "\"ANALYST\"");
        let parsed: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }
}
