// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single embedded redb database under
//! `DATA_DIR`. Records are stored as JSON values keyed by numeric id, with
//! secondary index tables for lookups by email and public client uid.
//!
//! The request resolver only needs two read-only lookups, expressed by the
//! [`IdentityStore`] trait so it can be exercised against any backing store.

pub mod database;

pub use database::Database;

use crate::models::{Client, User};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
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

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Identity lookups used while authenticating a request.
///
/// Both methods filter out revoked records.
pub trait IdentityStore: Send + Sync {
    fn find_active_client_by_id(&self, client_id: i64) -> StorageResult<Option<Client>>;

    fn find_active_user_by_id(&self, user_id: i64) -> StorageResult<Option<User>>;
}
