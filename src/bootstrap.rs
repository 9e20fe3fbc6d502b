// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Startup reconciliation of the role and admin-account baseline.
//!
//! [`run`] executes once, before the listener is bound, inside a single
//! write transaction. It converges the store to:
//!
//! - both roles (`ADMIN`, `ANALYST`) present
//! - the privileged account `admin` / `admin@churninsight.com` present,
//!   active, holding both roles, with a non-blank credential
//!
//! Only fields that are wrong are rewritten. A non-blank credential is never
//! replaced. A second run over a converged store performs no writes.

use crate::auth::password::{hash_password, PasswordError};
use crate::auth::Role;
use crate::config::{ADMIN_EMAIL, ADMIN_FULL_NAME, ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD};
use crate::storage::{CredentialStore, StoreError, StoredRole, StoredUser, UserDatabase};

/// A reconciliation failure. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to persist identity baseline: {0}")]
    Persistence(#[from] StoreError),

    #[error("failed to hash default credential: {0}")]
    Hashing(#[from] PasswordError),
}

/// A single field corrected on an existing privileged account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    Email,
    Username,
    Activated,
    Credential,
    AddedRole(Role),
}

/// What reconciliation did to the privileged account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No account existed; it was created
    Created,
    /// The account existed and these fields were corrected
    Repaired(Vec<Repair>),
    /// The account already matched; nothing was written
    Unchanged,
}

/// Create any missing role records.
fn ensure_roles<S: CredentialStore + ?Sized>(
    store: &mut S,
) -> Result<Vec<StoredRole>, BootstrapError> {
    let mut roles = Vec::with_capacity(Role::ALL.len());
    for name in Role::ALL {
        let role = match store.find_role_by_name(name)? {
            Some(existing) => existing,
            None => {
                tracing::info!(role = %name, "Creating role");
                let role = StoredRole::new(name);
                store.create_role(&role)?;
                role
            }
        };
        roles.push(role);
    }
    Ok(roles)
}

/// Converge `store` to the identity baseline.
///
/// Every read and write goes through `store`, so the caller decides the
/// transaction boundary.
pub fn reconcile<S: CredentialStore + ?Sized>(
    store: &mut S,
) -> Result<ReconcileOutcome, BootstrapError> {
    let roles = ensure_roles(store)?;

    let existing = match store.find_user_by_email(ADMIN_EMAIL)? {
        Some(user) => Some(user),
        None => store.find_user_by_username(ADMIN_USERNAME)?,
    };

    let Some(mut admin) = existing else {
        tracing::warn!(username = ADMIN_USERNAME, "No admin account found, creating default admin");
        let mut admin = StoredUser::new(
            ADMIN_USERNAME,
            ADMIN_EMAIL,
            ADMIN_FULL_NAME,
            hash_password(DEFAULT_ADMIN_PASSWORD)?,
        );
        for role in &roles {
            admin.roles.insert(role.name);
        }
        store.create_user(&admin)?;
        tracing::info!(
            id = %admin.id,
            username = %admin.username,
            email = %admin.email,
            "Admin account created"
        );
        return Ok(ReconcileOutcome::Created);
    };

    tracing::info!(
        id = %admin.id,
        username = %admin.username,
        email = %admin.email,
        "Admin account found, checking configuration"
    );

    let mut repairs = Vec::new();

    if admin.email != ADMIN_EMAIL {
        tracing::info!(from = %admin.email, to = ADMIN_EMAIL, "Correcting admin email");
        admin.email = ADMIN_EMAIL.to_string();
        repairs.push(Repair::Email);
    }

    if admin.username != ADMIN_USERNAME {
        tracing::info!(from = %admin.username, to = ADMIN_USERNAME, "Correcting admin username");
        admin.username = ADMIN_USERNAME.to_string();
        repairs.push(Repair::Username);
    }

    if !admin.active {
        tracing::info!("Reactivating admin account");
        admin.active = true;
        repairs.push(Repair::Activated);
    }

    if admin.has_blank_password() {
        tracing::warn!("Admin credential is blank, restoring default credential");
        admin.password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
        repairs.push(Repair::Credential);
    }

    for role in &roles {
        if admin.roles.insert(role.name) {
            tracing::info!(role = %role.name, "Adding missing role to admin");
            repairs.push(Repair::AddedRole(role.name));
        }
    }

    if repairs.is_empty() {
        tracing::info!("Admin account already correctly configured");
        return Ok(ReconcileOutcome::Unchanged);
    }

    store.update_user(&admin)?;
    tracing::info!(repairs = repairs.len(), roles = ?admin.roles, "Admin account synchronized");
    Ok(ReconcileOutcome::Repaired(repairs))
}

/// Reconcile inside one write transaction on `db`.
///
/// On error nothing is committed.
pub fn run(db: &UserDatabase) -> Result<ReconcileOutcome, BootstrapError> {
    let mut txn = db.begin()?;
    match reconcile(&mut txn) {
        Ok(outcome) => {
            txn.commit()?;
            Ok(outcome)
        }
        Err(e) => {
            if let Err(abort_err) = txn.abort() {
                tracing::error!(error = %abort_err, "Failed to abort bootstrap transaction");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::storage::StoreResult;
    use std::collections::{BTreeSet, HashMap};

    /// In-memory store counting writes.
    #[derive(Default)]
    struct MemoryStore {
        roles: HashMap<Role, StoredRole>,
        users: HashMap<String, StoredUser>,
        writes: usize,
    }

    impl MemoryStore {
        fn with_user(user: StoredUser) -> Self {
            let mut store = Self::default();
            for name in Role::ALL {
                store.roles.insert(name, StoredRole::new(name));
            }
            store.users.insert(user.id.clone(), user);
            store
        }

        fn only_user(&self) -> &StoredUser {
            assert_eq!(self.users.len(), 1);
            self.users.values().next().unwrap()
        }
    }

    impl CredentialStore for MemoryStore {
        fn find_role_by_name(&self, name: Role) -> StoreResult<Option<StoredRole>> {
            Ok(self.roles.get(&name).cloned())
        }

        fn create_role(&mut self, role: &StoredRole) -> StoreResult<()> {
            self.writes += 1;
            self.roles.insert(role.name, role.clone());
            Ok(())
        }

        fn find_user_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>> {
            Ok(self.users.values().find(|u| u.username == username).cloned())
        }

        fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
            Ok(self.users.values().find(|u| u.email == email).cloned())
        }

        fn create_user(&mut self, user: &StoredUser) -> StoreResult<()> {
            self.writes += 1;
            self.users.insert(user.id.clone(), user.clone());
            Ok(())
        }

        fn update_user(&mut self, user: &StoredUser) -> StoreResult<()> {
            self.writes += 1;
            self.users.insert(user.id.clone(), user.clone());
            Ok(())
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn find_role_by_name(&self, _name: Role) -> StoreResult<Option<StoredRole>> {
            Ok(None)
        }

        fn create_role(&mut self, _role: &StoredRole) -> StoreResult<()> {
            Err(StoreError::NotFound("roles table".to_string()))
        }

        fn find_user_by_username(&self, _username: &str) -> StoreResult<Option<StoredUser>> {
            Ok(None)
        }

        fn find_user_by_email(&self, _email: &str) -> StoreResult<Option<StoredUser>> {
            Ok(None)
        }

        fn create_user(&mut self, _user: &StoredUser) -> StoreResult<()> {
            Err(StoreError::NotFound("users table".to_string()))
        }

        fn update_user(&mut self, _user: &StoredUser) -> StoreResult<()> {
            Err(StoreError::NotFound("users table".to_string()))
        }
    }

    fn both_roles() -> BTreeSet<Role> {
        BTreeSet::from([Role::Admin, Role::Analyst])
    }

    #[test]
    fn empty_store_gets_roles_and_admin() {
        let mut store = MemoryStore::default();

        let outcome = reconcile(&mut store).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Created);

        assert!(store.roles.contains_key(&Role::Admin));
        assert!(store.roles.contains_key(&Role::Analyst));

        let admin = store.only_user();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.email, "admin@churninsight.com");
        assert!(admin.active);
        assert_eq!(admin.roles, both_roles());
        assert!(verify_password(&admin.password_hash, "admin123"));
    }

    #[test]
    fn damaged_admin_is_repaired() {
        let mut damaged =
            StoredUser::new(ADMIN_USERNAME, ADMIN_EMAIL, "Admin", "").with_role(Role::Analyst);
        damaged.active = false;
        let id = damaged.id.clone();
        let mut store = MemoryStore::with_user(damaged);

        let outcome = reconcile(&mut store).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Repaired(vec![
                Repair::Activated,
                Repair::Credential,
                Repair::AddedRole(Role::Admin),
            ])
        );

        let admin = store.only_user();
        assert_eq!(admin.id, id);
        assert!(admin.active);
        assert_eq!(admin.roles, both_roles());
        assert!(verify_password(&admin.password_hash, "admin123"));
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn correct_admin_is_left_untouched() {
        let operator_hash = hash_password("operator-chosen").unwrap();
        let admin = StoredUser::new(ADMIN_USERNAME, ADMIN_EMAIL, "Admin", operator_hash.as_str())
            .with_role(Role::Admin)
            .with_role(Role::Analyst);
        let mut store = MemoryStore::with_user(admin.clone());

        let outcome = reconcile(&mut store).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(store.writes, 0);
        assert_eq!(store.only_user(), &admin);
    }

    #[test]
    fn operator_credential_is_never_overwritten() {
        let operator_hash = hash_password("operator-chosen").unwrap();
        let mut admin =
            StoredUser::new(ADMIN_USERNAME, ADMIN_EMAIL, "Admin", operator_hash.as_str())
                .with_role(Role::Analyst);
        admin.active = false;
        let mut store = MemoryStore::with_user(admin);

        reconcile(&mut store).unwrap();

        let admin = store.only_user();
        assert_eq!(admin.password_hash, operator_hash);
        assert!(!verify_password(&admin.password_hash, "admin123"));
    }

    #[test]
    fn found_by_username_gets_email_corrected() {
        let admin = StoredUser::new(ADMIN_USERNAME, "old-admin@example.com", "Admin", "hash")
            .with_role(Role::Admin)
            .with_role(Role::Analyst);
        let mut store = MemoryStore::with_user(admin);

        let outcome = reconcile(&mut store).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Repaired(vec![Repair::Email]));
        assert_eq!(store.only_user().email, ADMIN_EMAIL);
    }

    #[test]
    fn found_by_email_gets_username_corrected() {
        let admin = StoredUser::new("root", ADMIN_EMAIL, "Admin", "hash")
            .with_role(Role::Admin)
            .with_role(Role::Analyst);
        let mut store = MemoryStore::with_user(admin);

        let outcome = reconcile(&mut store).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Repaired(vec![Repair::Username]));
        assert_eq!(store.only_user().username, ADMIN_USERNAME);
    }

    #[test]
    fn extra_roles_are_kept() {
        let admin =
            StoredUser::new(ADMIN_USERNAME, ADMIN_EMAIL, "Admin", "hash").with_role(Role::Admin);
        let mut store = MemoryStore::with_user(admin);

        let outcome = reconcile(&mut store).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Repaired(vec![Repair::AddedRole(Role::Analyst)])
        );
        assert_eq!(store.only_user().roles, both_roles());
    }

    #[test]
    fn second_run_performs_no_writes() {
        let mut store = MemoryStore::default();
        reconcile(&mut store).unwrap();
        let after_first = store.only_user().clone();
        let writes_after_first = store.writes;

        let outcome = reconcile(&mut store).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(store.writes, writes_after_first);
        assert_eq!(store.only_user(), &after_first);
    }

    #[test]
    fn persistence_failure_is_reported() {
        let result = reconcile(&mut BrokenStore);
        assert!(matches!(result, Err(BootstrapError::Persistence(_))));
    }

    #[test]
    fn run_commits_baseline_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("test.redb")).unwrap();

        assert_eq!(run(&db).unwrap(), ReconcileOutcome::Created);
        assert!(db.find_role_by_name(Role::Admin).unwrap().is_some());
        assert!(db.find_role_by_name(Role::Analyst).unwrap().is_some());

        let admin = db.find_user_by_username(ADMIN_USERNAME).unwrap().unwrap();
        assert_eq!(admin.email, ADMIN_EMAIL);
        assert_eq!(admin.roles, both_roles());

        assert_eq!(run(&db).unwrap(), ReconcileOutcome::Unchanged);
        let again = db.find_user_by_username(ADMIN_USERNAME).unwrap().unwrap();
        assert_eq!(again, admin);
    }

    #[test]
    fn run_repairs_persisted_admin() {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("test.redb")).unwrap();

        let mut damaged =
            StoredUser::new(ADMIN_USERNAME, ADMIN_EMAIL, "Admin", " ").with_role(Role::Analyst);
        damaged.active = false;
        let mut txn = db.begin().unwrap();
        txn.create_user(&damaged).unwrap();
        txn.commit().unwrap();

        assert!(matches!(run(&db).unwrap(), ReconcileOutcome::Repaired(_)));

        let admin = db.find_user_by_email(ADMIN_EMAIL).unwrap().unwrap();
        assert_eq!(admin.id, damaged.id);
        assert!(admin.active);
        assert_eq!(admin.roles, both_roles());
        assert!(verify_password(&admin.password_hash, DEFAULT_ADMIN_PASSWORD));
    }
}
