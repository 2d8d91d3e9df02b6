// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Routing and migration engine.
//!
//! The [`UserRouter`] is the only component that knows users live in two places:
//! - **North**: the local SQL table
//! - **South**: the remote user service
//!
//! # Operations
//!
//! ```text
//! create_user ──→ classify ──→ owning strategy.create
//!
//! search_for_user ──┬─→ North.get_by_id ─┐
//!                   └─→ South.get_by_id ─┴─→ join all → first hit (registry order)
//!
//! get_all_users ────┬─→ North.get_all ───┐
//!                   └─→ South.get_all ───┴─→ join all → concat → sort by id
//!
//! update_user ──→ same region? ──yes──→ strategy.update
//!                      │
//!                      no ──→ origin.get → destination.create → origin.delete
//! ```
//!
//! Fan-outs wait for every branch and judge each outcome on its own, so a slow
//! or failing backend never hides a hit from the other one.
//!
//! # Example
//!
//! ```rust,no_run
//! use hemisphere_store::{NewUser, RouterConfig, UserRouter};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let router = UserRouter::connect(&RouterConfig::default()).await?;
//!
//! let created = router.create_new_user(NewUser {
//!     username: "alice".into(),
//!     email: "alice@example.com".into(),
//!     password: "$2b$10$hash".into(),
//!     latitude: 45.0,
//!     longitude: -73.0,
//!     browser_language: None,
//! }).await?;
//!
//! let lookup = router.search_for_user(&created.id).await?;
//! println!("{}", lookup);
//! # Ok(())
//! # }
//! ```

mod types;
mod api;
mod migration;

pub use types::{RouterError, UserLookup, UserListing};

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::RouterConfig;
use crate::geo::{classify, Hemisphere};
use crate::metrics;
use crate::storage::remote::RemoteUserService;
use crate::storage::sql::SqlUserStore;
use crate::storage::{StorageError, UserStorageStrategy};
use crate::strategy::{LocalStrategy, RemoteStrategy, StrategyRegistry};

/// Outcome of one fan-out branch.
struct Branch<T> {
    region: Hemisphere,
    backend: &'static str,
    result: Result<T, StorageError>,
}

/// Routes user operations to the backend owning each record.
///
/// Holds an immutable [`StrategyRegistry`]; cloning the router is cheap and
/// clones share the same strategies.
#[derive(Clone, Debug)]
pub struct UserRouter {
    registry: StrategyRegistry,
    enforce_global_uniqueness: bool,
}

impl UserRouter {
    /// Build a router over an already-assembled registry.
    #[must_use]
    pub fn new(registry: StrategyRegistry) -> Self {
        if !registry.is_complete() {
            warn!(registry = ?registry, "Strategy registry does not cover every hemisphere");
        }
        Self {
            registry,
            enforce_global_uniqueness: true,
        }
    }

    /// Standard wiring: SQL for the north, the remote service for the south.
    #[must_use]
    pub fn with_backends(sql: Arc<SqlUserStore>, remote: Arc<RemoteUserService>) -> Self {
        let registry = StrategyRegistry::builder()
            .register(Hemisphere::North, Arc::new(LocalStrategy::new(sql)))
            .register(Hemisphere::South, Arc::new(RemoteStrategy::new(remote)))
            .build();
        Self::new(registry)
    }

    /// Connect both backends from configuration.
    pub async fn connect(config: &RouterConfig) -> Result<Self, RouterError> {
        let sql = SqlUserStore::new(&config.sql_url, &config.sql_options())
            .await
            .map_err(|e| RouterError::from_storage("sql", e))?;
        let remote = RemoteUserService::new(config.remote_latency());

        info!(
            sql_url = %redact_url(&config.sql_url),
            remote_latency_ms = config.remote_latency_ms,
            "User router connected"
        );

        Ok(Self::with_backends(Arc::new(sql), Arc::new(remote))
            .with_global_uniqueness(config.enforce_global_uniqueness))
    }

    /// Toggle the cross-hemisphere id/username/email check.
    ///
    /// When on, every create (and every in-place update touching username or
    /// email) first lists the other hemisphere's backend. That costs a full
    /// round trip and a scan of its records, and the write fails with a backend
    /// error while that backend is down, even if the owning one is healthy.
    #[must_use]
    pub fn with_global_uniqueness(mut self, enabled: bool) -> Self {
        self.enforce_global_uniqueness = enabled;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Strategy registered for a hemisphere.
    pub fn strategy_for(&self, hemisphere: Hemisphere) -> Result<&Arc<dyn UserStorageStrategy>, RouterError> {
        self.registry
            .get(hemisphere)
            .ok_or(RouterError::UnroutableRegion(hemisphere))
    }

    /// Classify the coordinates and return the owning hemisphere with its strategy.
    pub fn resolve_strategy(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<(Hemisphere, &Arc<dyn UserStorageStrategy>), RouterError> {
        let hemisphere = classify(latitude, longitude)?;
        Ok((hemisphere, self.strategy_for(hemisphere)?))
    }

    /// Run `call` against every registered strategy concurrently and wait for all.
    ///
    /// Branches come back in registration order. A branch that panics is
    /// reported as a backend error for its region.
    async fn fan_out<T, F, Fut>(&self, operation: &'static str, call: F) -> Vec<Branch<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn UserStorageStrategy>) -> Fut,
        Fut: Future<Output = Result<T, StorageError>> + Send + 'static,
    {
        let mut join_set: JoinSet<(usize, Result<T, StorageError>)> = JoinSet::new();
        for (index, (_, strategy)) in self.registry.iter().enumerate() {
            let branch = call(strategy.clone());
            join_set.spawn(async move { (index, branch.await) });
        }

        let mut slots: Vec<Option<Result<T, StorageError>>> =
            (0..self.registry.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(operation, error = %e, "Fan-out branch did not complete"),
            }
        }

        self.registry
            .iter()
            .zip(slots)
            .map(|((region, strategy), slot)| Branch {
                region,
                backend: strategy.backend(),
                result: slot.unwrap_or_else(|| {
                    Err(StorageError::Backend(format!("{} task aborted", operation)))
                }),
            })
            .collect()
    }

    /// Log and count a branch fault that a fan-out is tolerating.
    fn note_fault(operation: &'static str, region: Hemisphere, backend: &'static str, error: &StorageError) {
        warn!(operation, region = %region, backend, error = %error, "Backend failed during fan-out");
        metrics::record_fanout_fault(region.as_str(), operation);
    }
}

/// Strip credentials from a connection URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_only_router() -> UserRouter {
        let registry = StrategyRegistry::builder()
            .register(
                Hemisphere::South,
                Arc::new(RemoteStrategy::new(Arc::new(RemoteUserService::default()))),
            )
            .build();
        UserRouter::new(registry)
    }

    #[test]
    fn test_resolve_strategy_picks_owner() {
        let router = remote_only_router();
        let (hemisphere, strategy) = router.resolve_strategy(-33.0, 151.0).unwrap();
        assert_eq!(hemisphere, Hemisphere::South);
        assert_eq!(strategy.backend(), "remote");
    }

    #[test]
    fn test_resolve_strategy_unroutable() {
        let router = remote_only_router();
        assert_eq!(
            router.resolve_strategy(45.0, -73.0).err(),
            Some(RouterError::UnroutableRegion(Hemisphere::North))
        );
    }

    #[test]
    fn test_resolve_strategy_invalid_coordinates() {
        let router = remote_only_router();
        assert!(matches!(
            router.resolve_strategy(-95.0, 0.0),
            Err(RouterError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(redact_url("mysql://user:pass@db:3306/users"), "mysql://***@db:3306/users");
        assert_eq!(redact_url("sqlite://users.db?mode=rwc"), "sqlite://users.db?mode=rwc");
    }

    #[tokio::test]
    async fn test_fan_out_keeps_registration_order() {
        let router = remote_only_router();
        let branches = router
            .fan_out("get_all", |strategy| async move { strategy.get_all().await })
            .await;
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].region, Hemisphere::South);
        assert_eq!(branches[0].backend, "remote");
        assert!(branches[0].result.as_ref().unwrap().is_empty());
    }
}
