// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use thiserror::Error;

use crate::user::{User, UserPatch};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("User '{0}' not found")]
    NotFound(String),
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a write statement against the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunResult {
    pub rows_affected: u64,
}

/// The five-operation capability set every backend exposes.
///
/// Implementations own exactly one adapter handle and hold no other state.
/// The router keeps one implementation per [`crate::Hemisphere`].
#[async_trait]
pub trait UserStorageStrategy: Send + Sync {
    /// Short backend label for logs and metrics ("sql", "remote").
    fn backend(&self) -> &'static str;

    /// Store a new record. Fails with [`StorageError::UniqueViolation`] when the
    /// id, username or email is already taken in this backend.
    async fn create(&self, user: &User) -> Result<User, StorageError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StorageError>;

    /// All records held by this backend, in no particular order.
    async fn get_all(&self) -> Result<Vec<User>, StorageError>;

    /// Apply a patch in place and return the updated record.
    async fn update(&self, id: &str, patch: &UserPatch) -> Result<User, StorageError>;

    /// Returns `true` iff a record was actually removed.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;
}
