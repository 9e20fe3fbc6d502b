// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principals and the identity-loading capability.

use std::collections::BTreeSet;

use super::{AuthError, Role};
use crate::storage::{StoredUser, UserDatabase};

/// The account facts authentication decisions are made on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Account identifier (username)
    pub username: String,
    /// Stored credential hash, opaque to the auth layer
    pub password_hash: String,
    /// Role memberships
    pub roles: BTreeSet<Role>,
    /// Inactive principals cannot authenticate
    pub active: bool,
}

impl From<StoredUser> for Principal {
    fn from(user: StoredUser) -> Self {
        Self {
            username: user.username,
            password_hash: user.password_hash,
            roles: user.roles,
            active: user.active,
        }
    }
}

/// Resolves a token subject to an active principal.
///
/// Implementations fail with `IdentityNotFound` for unknown subjects and
/// `IdentityInactive` for deactivated accounts; callers treat both the same.
pub trait IdentityLoader: Send + Sync {
    fn load_principal(&self, subject: &str) -> Result<Principal, AuthError>;
}

impl IdentityLoader for UserDatabase {
    fn load_principal(&self, subject: &str) -> Result<Principal, AuthError> {
        let user = self
            .find_user_by_login(subject)?
            .ok_or(AuthError::IdentityNotFound)?;

        if !user.active {
            return Err(AuthError::IdentityInactive);
        }

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CredentialStore;

    fn temp_db() -> (UserDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn insert(db: &UserDatabase, user: &StoredUser) {
        let mut txn = db.begin().unwrap();
        txn.create_user(user).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn loads_active_principal_by_username_or_email() {
        let (db, _dir) = temp_db();
        insert(
            &db,
            &StoredUser::new("jdoe", "jdoe@example.com", "Jane", "hash").with_role(Role::Analyst),
        );

        let principal = db.load_principal("jdoe").unwrap();
        assert_eq!(principal.username, "jdoe");
        assert_eq!(principal.roles, BTreeSet::from([Role::Analyst]));

        let by_email = db.load_principal("jdoe@example.com").unwrap();
        assert_eq!(by_email.username, "jdoe");
    }

    #[test]
    fn unknown_subject_is_not_found() {
        let (db, _dir) = temp_db();
        assert!(matches!(
            db.load_principal("ghost"),
            Err(AuthError::IdentityNotFound)
        ));
    }

    #[test]
    fn inactive_account_is_refused() {
        let (db, _dir) = temp_db();
        let mut user = StoredUser::new("sleepy", "sleepy@example.com", "S", "hash");
        user.active = false;
        insert(&db, &user);

        assert!(matches!(
            db.load_principal("sleepy"),
            Err(AuthError::IdentityInactive)
        ));
    }
}
