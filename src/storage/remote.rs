// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote user service for the southern hemisphere.
//!
//! The real service lives behind the network. This in-process stand-in keeps the
//! parts the router has to cope with: every call pays a configurable latency,
//! the service enforces its own uniqueness rules, and it can be switched offline
//! to simulate an outage that is independent of the local store.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;

use super::traits::StorageError;
use crate::user::{User, UserPatch};

pub struct RemoteUserService {
    users: RwLock<BTreeMap<String, User>>,
    latency: Duration,
    available: AtomicBool,
}

impl RemoteUserService {
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            latency,
            available: AtomicBool::new(true),
        }
    }

    /// Start with records already held by the service.
    #[must_use]
    pub fn with_users(latency: Duration, users: impl IntoIterator<Item = User>) -> Self {
        let service = Self::new(latency);
        {
            let mut map = service.users.write();
            for user in users {
                map.insert(user.id.clone(), user);
            }
        }
        service
    }

    /// Toggle simulated availability. While offline every call fails with
    /// [`StorageError::Unavailable`] after paying the usual latency.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    async fn round_trip(&self) -> Result<(), StorageError> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        if self.is_available() {
            Ok(())
        } else {
            Err(StorageError::Unavailable("remote user service is offline".into()))
        }
    }

    /// Reject a username or email already held by a record other than `except_id`.
    fn check_unique(
        users: &BTreeMap<String, User>,
        except_id: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), StorageError> {
        for existing in users.values().filter(|u| u.id != except_id) {
            if username == Some(existing.username.as_str()) {
                return Err(StorageError::UniqueViolation(format!(
                    "username '{}' already exists",
                    existing.username
                )));
            }
            if email == Some(existing.email.as_str()) {
                return Err(StorageError::UniqueViolation(format!(
                    "email '{}' already exists",
                    existing.email
                )));
            }
        }
        Ok(())
    }

    pub async fn insert_user(&self, user: &User) -> Result<User, StorageError> {
        self.round_trip().await?;

        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(StorageError::UniqueViolation(format!("id '{}' already exists", user.id)));
        }
        Self::check_unique(&users, &user.id, Some(&user.username), Some(&user.email))?;
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    pub async fn fetch_all_users(&self) -> Result<Vec<User>, StorageError> {
        self.round_trip().await?;
        Ok(self.users.read().values().cloned().collect())
    }

    pub async fn fetch_single_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        self.round_trip().await?;
        Ok(self.users.read().get(id).cloned())
    }

    pub async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<User, StorageError> {
        self.round_trip().await?;

        let mut users = self.users.write();
        if !users.contains_key(id) {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Self::check_unique(&users, id, patch.username.as_deref(), patch.email.as_deref())?;

        let user = users
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        user.apply(patch);
        Ok(user.clone())
    }

    pub async fn delete_user(&self, id: &str) -> Result<bool, StorageError> {
        self.round_trip().await?;
        Ok(self.users.write().remove(id).is_some())
    }
}

impl Default for RemoteUserService {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
