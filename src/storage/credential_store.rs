// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential store contract.
//!
//! Every method runs inside the transaction owned by the implementor, so a
//! caller that performs several lookups and writes through one value sees
//! them commit or abort together.

use super::{StoreResult, StoredRole, StoredUser};
use crate::auth::Role;

/// Transactional access to accounts and roles.
pub trait CredentialStore {
    /// Look up a role by name.
    fn find_role_by_name(&self, name: Role) -> StoreResult<Option<StoredRole>>;

    /// Insert a role. Fails with `AlreadyExists` if the name is taken.
    fn create_role(&mut self, role: &StoredRole) -> StoreResult<()>;

    /// Look up an account by username.
    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>>;

    /// Look up an account by email.
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>>;

    /// Insert an account. Fails with `AlreadyExists` if its id, username or
    /// email is taken.
    fn create_user(&mut self, user: &StoredUser) -> StoreResult<()>;

    /// Replace an existing account, keeping the secondary indexes in step.
    fn update_user(&mut self, user: &StoredUser) -> StoreResult<()>;
}
