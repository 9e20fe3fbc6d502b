// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `roles`: role name → serialized StoredRole
//! - `users`: user id → serialized StoredUser
//! - `users_by_username`: username → user id
//! - `users_by_email`: email → user id
//! - `users_by_reset_token`: outstanding reset token → user id
//! - `predictions`: `{username}\0{record id}` → serialized PredictionRecord

use std::path::Path;

use chrono::Utc;
use redb::{
    Database, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction,
};

use super::{CredentialStore, PredictionRecord, StoredRole, StoredUser};
use crate::auth::Role;

// =============================================================================
// Table Definitions
// =============================================================================

/// Roles: name → serialized StoredRole (JSON bytes).
const ROLES: TableDefinition<&str, &[u8]> = TableDefinition::new("roles");

/// Primary table: user id → serialized StoredUser (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Index: username → user id.
const USERS_BY_USERNAME: TableDefinition<&str, &str> = TableDefinition::new("users_by_username");

/// Index: email → user id.
const USERS_BY_EMAIL: TableDefinition<&str, &str> = TableDefinition::new("users_by_email");

/// Index: password-reset token → user id.
const USERS_BY_RESET_TOKEN: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_reset_token");

/// Prediction history, keyed by requester so one account's rows are contiguous.
const PREDICTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("predictions");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Row helpers
// =============================================================================

fn user_by_id<T>(users: &T, id: &str) -> StoreResult<Option<StoredUser>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let user = users
        .get(id)?
        .map(|value| serde_json::from_slice::<StoredUser>(value.value()))
        .transpose()?;
    Ok(user)
}

fn user_by_index<T, I>(users: &T, index: &I, key: &str) -> StoreResult<Option<StoredUser>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
    I: ReadableTable<&'static str, &'static str>,
{
    let id = index.get(key)?.map(|value| value.value().to_string());
    match id {
        Some(id) => user_by_id(users, &id),
        None => Ok(None),
    }
}

fn role_by_name<T>(roles: &T, name: Role) -> StoreResult<Option<StoredRole>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let role = roles
        .get(name.as_str())?
        .map(|value| serde_json::from_slice::<StoredRole>(value.value()))
        .transpose()?;
    Ok(role)
}

fn prediction_key(username: &str, id: &str) -> String {
    format!("{username}\0{id}")
}

fn newest_first(records: &mut [PredictionRecord]) {
    records.sort_by(|a, b| b.predicted_at.cmp(&a.predicted_at));
}

/// Point an index key at `id`, refusing keys already owned by another account.
fn claim_index_key(
    index: &mut Table<'_, &'static str, &'static str>,
    key: &str,
    id: &str,
    what: &str,
) -> StoreResult<()> {
    let owner = index.get(key)?.map(|value| value.value().to_string());
    match owner {
        Some(owner) if owner != id => Err(StoreError::AlreadyExists(format!("{what} {key}"))),
        _ => {
            index.insert(key, id)?;
            Ok(())
        }
    }
}

// =============================================================================
// UserDatabase
// =============================================================================

/// Embedded ACID credential database.
pub struct UserDatabase {
    db: Database,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ROLES)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_USERNAME)?;
            let _ = write_txn.open_table(USERS_BY_EMAIL)?;
            let _ = write_txn.open_table(USERS_BY_RESET_TOKEN)?;
            let _ = write_txn.open_table(PREDICTIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Start a write transaction.
    ///
    /// Nothing written through the returned handle is visible to readers
    /// until [`UserTxn::commit`] succeeds; dropping it aborts.
    pub fn begin(&self) -> StoreResult<UserTxn> {
        Ok(UserTxn {
            txn: self.db.begin_write()?,
        })
    }

    /// Look up an account by username.
    pub fn find_user_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        self.read_by_index(USERS_BY_USERNAME, username)
    }

    /// Look up an account by email.
    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        self.read_by_index(USERS_BY_EMAIL, email)
    }

    /// Look up an account by username, falling back to email.
    pub fn find_user_by_login(&self, login: &str) -> StoreResult<Option<StoredUser>> {
        match self.find_user_by_username(login)? {
            Some(user) => Ok(Some(user)),
            None => self.find_user_by_email(login),
        }
    }

    /// Look up a role by name.
    pub fn find_role_by_name(&self, name: Role) -> StoreResult<Option<StoredRole>> {
        let read_txn = self.db.begin_read()?;
        let roles = read_txn.open_table(ROLES)?;
        role_by_name(&roles, name)
    }

    /// All accounts, ordered by username.
    pub fn list_users(&self) -> StoreResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(serde_json::from_slice::<StoredUser>(value.value())?);
        }
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    /// Append one served prediction to the history.
    pub fn record_prediction(&self, record: &PredictionRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;
        let key = prediction_key(&record.username, &record.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PREDICTIONS)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Predictions requested by `username`, newest first.
    pub fn predictions_for(&self, username: &str) -> StoreResult<Vec<PredictionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PREDICTIONS)?;
        let prefix = prediction_key(username, "");

        let mut records = Vec::new();
        for entry in table.range(prefix.as_str()..)? {
            let (key, value) = entry?;
            if !key.value().starts_with(prefix.as_str()) {
                break;
            }
            let record = serde_json::from_slice::<PredictionRecord>(value.value())?;
            // Usernames may themselves contain the separator
            if record.username == username {
                records.push(record);
            }
        }
        newest_first(&mut records);
        Ok(records)
    }

    /// Every recorded prediction, newest first.
    pub fn all_predictions(&self) -> StoreResult<Vec<PredictionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PREDICTIONS)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice::<PredictionRecord>(value.value())?);
        }
        newest_first(&mut records);
        Ok(records)
    }

    /// Verify the database can serve a read transaction.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }

    fn read_by_index(
        &self,
        index: TableDefinition<'static, &'static str, &'static str>,
        key: &str,
    ) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let index = read_txn.open_table(index)?;
        user_by_index(&users, &index, key)
    }
}

// =============================================================================
// UserTxn
// =============================================================================

/// A write transaction over the credential tables.
pub struct UserTxn {
    txn: WriteTransaction,
}

impl UserTxn {
    /// Make every write performed through this transaction durable.
    pub fn commit(self) -> StoreResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    /// Discard every write performed through this transaction.
    pub fn abort(self) -> StoreResult<()> {
        self.txn.abort()?;
        Ok(())
    }

    /// Look up the account holding an outstanding reset token.
    pub fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<StoredUser>> {
        let users = self.txn.open_table(USERS)?;
        let index = self.txn.open_table(USERS_BY_RESET_TOKEN)?;
        user_by_index(&users, &index, token)
    }
}

impl CredentialStore for UserTxn {
    fn find_role_by_name(&self, name: Role) -> StoreResult<Option<StoredRole>> {
        let roles = self.txn.open_table(ROLES)?;
        role_by_name(&roles, name)
    }

    fn create_role(&mut self, role: &StoredRole) -> StoreResult<()> {
        let json = serde_json::to_vec(role)?;
        let mut roles = self.txn.open_table(ROLES)?;
        if roles.get(role.name.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("Role {}", role.name)));
        }
        roles.insert(role.name.as_str(), json.as_slice())?;
        Ok(())
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        let users = self.txn.open_table(USERS)?;
        let index = self.txn.open_table(USERS_BY_USERNAME)?;
        user_by_index(&users, &index, username)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        let users = self.txn.open_table(USERS)?;
        let index = self.txn.open_table(USERS_BY_EMAIL)?;
        user_by_index(&users, &index, email)
    }

    fn create_user(&mut self, user: &StoredUser) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let mut users = self.txn.open_table(USERS)?;
        let mut by_username = self.txn.open_table(USERS_BY_USERNAME)?;
        let mut by_email = self.txn.open_table(USERS_BY_EMAIL)?;
        let mut by_reset_token = self.txn.open_table(USERS_BY_RESET_TOKEN)?;

        if users.get(user.id.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("User {}", user.id)));
        }
        if by_username.get(user.username.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("username {}", user.username)));
        }
        if by_email.get(user.email.as_str())?.is_some() {
            return Err(StoreError::AlreadyExists(format!("email {}", user.email)));
        }

        users.insert(user.id.as_str(), json.as_slice())?;
        by_username.insert(user.username.as_str(), user.id.as_str())?;
        by_email.insert(user.email.as_str(), user.id.as_str())?;
        if let Some(token) = &user.reset_token {
            by_reset_token.insert(token.as_str(), user.id.as_str())?;
        }
        Ok(())
    }

    /// Replace an existing account. `updated_at` is stamped by the store.
    fn update_user(&mut self, user: &StoredUser) -> StoreResult<()> {
        let mut record = user.clone();
        record.updated_at = Utc::now();
        let json = serde_json::to_vec(&record)?;

        let mut users = self.txn.open_table(USERS)?;
        let previous = user_by_id(&users, &record.id)?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", record.id)))?;

        if previous.username != record.username {
            let mut by_username = self.txn.open_table(USERS_BY_USERNAME)?;
            claim_index_key(&mut by_username, &record.username, &record.id, "username")?;
            by_username.remove(previous.username.as_str())?;
        }

        if previous.email != record.email {
            let mut by_email = self.txn.open_table(USERS_BY_EMAIL)?;
            claim_index_key(&mut by_email, &record.email, &record.id, "email")?;
            by_email.remove(previous.email.as_str())?;
        }

        if previous.reset_token != record.reset_token {
            let mut by_reset_token = self.txn.open_table(USERS_BY_RESET_TOKEN)?;
            if let Some(old) = &previous.reset_token {
                by_reset_token.remove(old.as_str())?;
            }
            if let Some(new) = &record.reset_token {
                by_reset_token.insert(new.as_str(), record.id.as_str())?;
            }
        }

        users.insert(record.id.as_str(), json.as_slice())?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (UserDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn sample_user(username: &str) -> StoredUser {
        StoredUser::new(
            username,
            format!("{username}@example.com"),
            "Sample User",
            "$argon2id$v=19$placeholder",
        )
        .with_role(Role::Analyst)
    }

    #[test]
    fn create_and_find_user() {
        let (db, _dir) = temp_db();
        let user = sample_user("jdoe");

        let mut txn = db.begin().unwrap();
        txn.create_user(&user).unwrap();
        txn.commit().unwrap();

        let by_name = db.find_user_by_username("jdoe").unwrap().unwrap();
        assert_eq!(by_name, user);
        let by_email = db.find_user_by_email("jdoe@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(db.find_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn find_by_login_falls_back_to_email() {
        let (db, _dir) = temp_db();
        let mut txn = db.begin().unwrap();
        txn.create_user(&sample_user("jdoe")).unwrap();
        txn.commit().unwrap();

        assert!(db.find_user_by_login("jdoe").unwrap().is_some());
        assert!(db.find_user_by_login("jdoe@example.com").unwrap().is_some());
        assert!(db.find_user_by_login("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let (db, _dir) = temp_db();
        let mut txn = db.begin().unwrap();
        txn.create_user(&sample_user("jdoe")).unwrap();

        let same_name = sample_user("jdoe");
        assert!(matches!(
            txn.create_user(&same_name),
            Err(StoreError::AlreadyExists(_))
        ));

        let mut same_email = sample_user("other");
        same_email.email = "jdoe@example.com".to_string();
        assert!(matches!(
            txn.create_user(&same_email),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn uncommitted_writes_are_discarded() {
        let (db, _dir) = temp_db();
        let mut txn = db.begin().unwrap();
        txn.create_user(&sample_user("jdoe")).unwrap();
        txn.create_role(&StoredRole::new(Role::Admin)).unwrap();
        txn.abort().unwrap();

        assert!(db.find_user_by_username("jdoe").unwrap().is_none());
        assert!(db.find_role_by_name(Role::Admin).unwrap().is_none());
    }

    #[test]
    fn writes_are_visible_inside_the_transaction() {
        let (db, _dir) = temp_db();
        let mut txn = db.begin().unwrap();
        txn.create_role(&StoredRole::new(Role::Analyst)).unwrap();
        assert!(txn.find_role_by_name(Role::Analyst).unwrap().is_some());
        assert!(matches!(
            txn.create_role(&StoredRole::new(Role::Analyst)),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn update_moves_username_and_email_indexes() {
        let (db, _dir) = temp_db();
        let mut user = sample_user("old");

        let mut txn = db.begin().unwrap();
        txn.create_user(&user).unwrap();
        user.username = "new".to_string();
        user.email = "new@example.com".to_string();
        txn.update_user(&user).unwrap();
        txn.commit().unwrap();

        assert!(db.find_user_by_username("old").unwrap().is_none());
        assert!(db.find_user_by_email("old@example.com").unwrap().is_none());
        let moved = db.find_user_by_username("new").unwrap().unwrap();
        assert_eq!(moved.email, "new@example.com");
        assert!(moved.updated_at >= user.updated_at);
    }

    #[test]
    fn update_refuses_username_owned_by_another_account() {
        let (db, _dir) = temp_db();
        let mut txn = db.begin().unwrap();
        txn.create_user(&sample_user("alice")).unwrap();
        let mut bob = sample_user("bob");
        txn.create_user(&bob).unwrap();

        bob.username = "alice".to_string();
        assert!(matches!(
            txn.update_user(&bob),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn update_of_unknown_user_fails() {
        let (db, _dir) = temp_db();
        let mut txn = db.begin().unwrap();
        assert!(matches!(
            txn.update_user(&sample_user("ghost")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn reset_token_index_follows_updates() {
        let (db, _dir) = temp_db();
        let mut user = sample_user("jdoe");

        let mut txn = db.begin().unwrap();
        txn.create_user(&user).unwrap();
        user.reset_token = Some("token-1".to_string());
        txn.update_user(&user).unwrap();
        assert_eq!(
            txn.find_user_by_reset_token("token-1").unwrap().unwrap().id,
            user.id
        );

        user.reset_token = None;
        txn.update_user(&user).unwrap();
        assert!(txn.find_user_by_reset_token("token-1").unwrap().is_none());
    }

    #[test]
    fn list_users_is_sorted() {
        let (db, _dir) = temp_db();
        let mut txn = db.begin().unwrap();
        txn.create_user(&sample_user("zoe")).unwrap();
        txn.create_user(&sample_user("adam")).unwrap();
        txn.commit().unwrap();

        let names: Vec<String> = db
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["adam", "zoe"]);
        assert!(db.ping().is_ok());
    }

    fn record(username: &str, customer_id: &str, minutes_ago: i64) -> PredictionRecord {
        let request = crate::prediction::PredictionRequest {
            customer_id: Some(customer_id.to_string()),
            features: serde_json::json!({"tenure": 1}),
        };
        let outcome = crate::prediction::PredictionOutcome {
            customer_id: Some(customer_id.to_string()),
            churn_probability: 0.5,
        };
        let mut record = PredictionRecord::new(username, &request, &outcome);
        record.predicted_at = Utc::now() - chrono::Duration::minutes(minutes_ago);
        record
    }

    #[test]
    fn predictions_are_scoped_to_their_requester() {
        let (db, _dir) = temp_db();
        db.record_prediction(&record("ana", "C-1", 10)).unwrap();
        db.record_prediction(&record("ana", "C-2", 1)).unwrap();
        db.record_prediction(&record("bob", "C-3", 5)).unwrap();
        // Shares the "ana" prefix up to the separator
        db.record_prediction(&record("ana\0x", "C-4", 2)).unwrap();

        let ana: Vec<_> = db
            .predictions_for("ana")
            .unwrap()
            .into_iter()
            .map(|r| r.customer_id.unwrap())
            .collect();
        assert_eq!(ana, vec!["C-2", "C-1"]);

        assert_eq!(db.predictions_for("bob").unwrap().len(), 1);
        assert!(db.predictions_for("nobody").unwrap().is_empty());
    }

    #[test]
    fn all_predictions_are_newest_first() {
        let (db, _dir) = temp_db();
        db.record_prediction(&record("ana", "C-1", 10)).unwrap();
        db.record_prediction(&record("bob", "C-2", 1)).unwrap();
        db.record_prediction(&record("ana", "C-3", 5)).unwrap();

        let all: Vec<_> = db
            .all_predictions()
            .unwrap()
            .into_iter()
            .map(|r| r.customer_id.unwrap())
            .collect();
        assert_eq!(all, vec!["C-2", "C-3", "C-1"]);
    }
}
