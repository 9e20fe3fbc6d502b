// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AccessPolicy, TokenService};
use crate::prediction::{PredictionService, UnavailablePredictionService};
use crate::storage::UserDatabase;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserDatabase>,
    pub tokens: Arc<TokenService>,
    pub policy: Arc<AccessPolicy>,
    pub predictor: Arc<dyn PredictionService>,
}

impl AppState {
    pub fn new(users: UserDatabase, tokens: TokenService) -> Self {
        Self {
            users: Arc::new(users),
            tokens: Arc::new(tokens),
            policy: Arc::new(AccessPolicy::standard()),
            predictor: Arc::new(UnavailablePredictionService),
        }
    }

    /// Replace the prediction backend.
    pub fn with_predictor(mut self, predictor: Arc<dyn PredictionService>) -> Self {
        self.predictor = predictor;
        self
    }
}

/// State over a throwaway database, for tests.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let users = UserDatabase::open(&temp_dir.path().join("users.redb"))
        .expect("Failed to open database");
    let tokens =
        TokenService::new(b"test-state-secret-0123456789abcdef0123456789abcdef0123456789abcd");
    (AppState::new(users, tokens), temp_dir)
}
