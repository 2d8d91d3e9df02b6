// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use std::sync::Arc;

use crate::metrics::{self, LatencyTimer};
use crate::storage::remote::RemoteUserService;
use crate::storage::{StorageError, UserStorageStrategy};
use crate::user::{User, UserPatch};

const BACKEND: &str = "remote";

/// Strategy over the remote user service.
pub struct RemoteStrategy {
    service: Arc<RemoteUserService>,
}

impl RemoteStrategy {
    #[must_use]
    pub fn new(service: Arc<RemoteUserService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl UserStorageStrategy for RemoteStrategy {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn create(&self, user: &User) -> Result<User, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "create");
        let result = self.service.insert_user(user).await;
        metrics::record_result(BACKEND, "create", &result);
        result
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "get");
        let result = self.service.fetch_single_user(id).await;
        metrics::record_result(BACKEND, "get", &result);
        result
    }

    async fn get_all(&self) -> Result<Vec<User>, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "get_all");
        let result = self.service.fetch_all_users().await;
        metrics::record_result(BACKEND, "get_all", &result);
        result
    }

    async fn update(&self, id: &str, patch: &UserPatch) -> Result<User, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "update");
        let result = self.service.update_user(id, patch).await;
        metrics::record_result(BACKEND, "update", &result);
        result
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let _timer = LatencyTimer::new(BACKEND, "delete");
        let result = self.service.delete_user(id).await;
        metrics::record_result(BACKEND, "delete", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: format!("name-{}", id),
            email: format!("{}@example.com", id),
            password: "hashed".to_string(),
            latitude: -10.0,
            longitude: -73.0,
            browser_language: None,
        }
    }

    #[tokio::test]
    async fn test_delegates_to_service() {
        let service = Arc::new(RemoteUserService::default());
        let strategy = RemoteStrategy::new(service.clone());

        strategy.create(&test_user("s-1")).await.unwrap();
        assert_eq!(service.len(), 1);
        assert_eq!(strategy.get_all().await.unwrap().len(), 1);

        let updated = strategy
            .update("s-1", &UserPatch { longitude: Some(20.0), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.longitude, 20.0);

        assert!(strategy.delete("s-1").await.unwrap());
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn test_outage_surfaces_as_error() {
        let service = Arc::new(RemoteUserService::default());
        let strategy = RemoteStrategy::new(service.clone());
        service.set_available(false);

        assert!(matches!(strategy.get_by_id("s-1").await, Err(StorageError::Unavailable(_))));
    }
}
