// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage Module
//!
//! Accounts, roles and the prediction history live in a single redb
//! database file under `DATA_DIR`.
//! All writes go through a [`UserTxn`], which implements the
//! [`CredentialStore`] contract consumed by the bootstrap reconciler and the
//! account endpoints; reads that do not need transactional grouping are
//! served directly by [`UserDatabase`].
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   users.redb
//!     roles                 # name → role record
//!     users                 # id → account record
//!     users_by_username     # username → id
//!     users_by_email        # email → id
//!     users_by_reset_token  # reset token → id
//!     predictions           # username \0 id → prediction record
//! ```

pub mod credential_store;
pub mod records;
pub mod user_database;

pub use credential_store::CredentialStore;
pub use records::{PredictionRecord, StoredRole, StoredUser};
pub use user_database::{StoreError, StoreResult, UserDatabase, UserTxn};
