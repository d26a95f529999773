// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for handler tests.

use std::sync::Arc;

use axum::{body::to_bytes, response::Response};
use tempfile::TempDir;

use crate::{
    auth::{password::BcryptHasher, password::MIN_BCRYPT_COST, TokenCodec},
    state::AppState,
    storage::Database,
};

/// State over an empty database with no tables yet.
pub(crate) fn uninitialized_state() -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("test.redb")).unwrap();
    let codec = TokenCodec::new("test-secret").unwrap();
    let mut state = AppState::new(db, codec, Arc::new(BcryptHasher::new(MIN_BCRYPT_COST)));
    state.setup_enabled = true;
    (state, dir)
}

/// State over a database whose tables exist.
pub(crate) fn test_state() -> (AppState, TempDir) {
    let (state, dir) = uninitialized_state();
    state.db.ensure_tables().unwrap();
    (state, dir)
}

pub(crate) async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
