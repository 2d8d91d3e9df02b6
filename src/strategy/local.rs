// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use std::sync::Arc;

use crate::metrics::{self, LatencyTimer};
use crate::storage::sql::SqlUserStore;
use crate::storage::{StorageError, UserStorageStrategy};
use crate::user::{User, UserPatch};

const BACKEND: &str = "sql";

/// Strategy over the local SQL table.
pub struct LocalStrategy {
    store: Arc<SqlUserStore>,
}

impl LocalStrategy {
    #[must_use]
    pub fn new(store: Arc<SqlUserStore>) -> Self {
        Self { store }
    }

    async fn fetch_existing(&self, id: &str) -> Result<User, StorageError> {
        self.store
            .fetch_one(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl UserStorageStrategy for LocalStrategy {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn create(&self, user: &User) -> Result<User, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "create");
        let result = self.store.insert(user).await.map(|_| user.clone());
        metrics::record_result(BACKEND, "create", &result);
        result
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "get");
        let result = self.store.fetch_one(id).await;
        metrics::record_result(BACKEND, "get", &result);
        result
    }

    async fn get_all(&self) -> Result<Vec<User>, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "get_all");
        let result = self.store.fetch_all().await;
        metrics::record_result(BACKEND, "get_all", &result);
        result
    }

    async fn update(&self, id: &str, patch: &UserPatch) -> Result<User, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "update");
        let result = async {
            if patch.is_empty() {
                return self.fetch_existing(id).await;
            }
            // Zero affected rows is ambiguous on MySQL (unchanged values), so
            // re-read to tell "unchanged" from "missing".
            self.store.update(id, patch).await?;
            self.fetch_existing(id).await
        }
        .await;
        metrics::record_result(BACKEND, "update", &result);
        result
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "delete");
        let result = self.store.delete(id).await.map(|run| run.rows_affected > 0);
        metrics::record_result(BACKEND, "delete", &result);
        result
    }
}
