// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Chaos Testing for Hemisphere Store
//!
//! Failure scenarios driven through wrapper strategies:
//! 1. **ScriptedStrategy** - records every call and fails chosen operations
//! 2. **PanickingStrategy** - a backend whose task dies mid-fan-out
//!
//! Call logs assert ordering guarantees of the migration protocol, e.g. that the
//! destination write always precedes the origin delete.
//!
//! # Running Chaos Tests
//! ```bash
//! cargo test --test chaos -- --nocapture
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use hemisphere_store::{
    Hemisphere, RemoteStrategy, RemoteUserService, RouterError, StorageError, StrategyRegistry,
    User, UserPatch, UserRouter, UserStorageStrategy,
};

// =============================================================================
// Scripted Strategy - call recording and precise error injection
// =============================================================================

type CallLog = Arc<Mutex<Vec<String>>>;

/// Wraps a real strategy, logging `"<tag>.<op>"` for every call and failing the
/// operations named in `fail_ops`.
struct ScriptedStrategy {
    tag: &'static str,
    inner: RemoteStrategy,
    log: CallLog,
    fail_ops: Mutex<HashSet<&'static str>>,
}

impl ScriptedStrategy {
    fn new(tag: &'static str, service: Arc<RemoteUserService>, log: CallLog) -> Self {
        Self {
            tag,
            inner: RemoteStrategy::new(service),
            log,
            fail_ops: Mutex::new(HashSet::new()),
        }
    }

    fn fail_on(&self, op: &'static str) {
        self.fail_ops.lock().insert(op);
    }

    fn enter(&self, op: &'static str) -> Result<(), StorageError> {
        self.log.lock().push(format!("{}.{}", self.tag, op));
        if self.fail_ops.lock().contains(op) {
            return Err(StorageError::Backend(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStorageStrategy for ScriptedStrategy {
    fn backend(&self) -> &'static str {
        self.tag
    }

    async fn create(&self, user: &User) -> Result<User, StorageError> {
        self.enter("create")?;
        self.inner.create(user).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        self.enter("get_by_id")?;
        self.inner.get_by_id(id).await
    }

    async fn get_all(&self) -> Result<Vec<User>, StorageError> {
        self.enter("get_all")?;
        self.inner.get_all().await
    }

    async fn update(&self, id: &str, patch: &UserPatch) -> Result<User, StorageError> {
        self.enter("update")?;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.enter("delete")?;
        self.inner.delete(id).await
    }
}

/// Every lookup panics inside its fan-out task.
struct PanickingStrategy;

#[async_trait]
impl UserStorageStrategy for PanickingStrategy {
    fn backend(&self) -> &'static str {
        "panicking"
    }

    async fn create(&self, _user: &User) -> Result<User, StorageError> {
        Err(StorageError::Unavailable("panicking backend".into()))
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<User>, StorageError> {
        panic!("backend crashed during lookup")
    }

    async fn get_all(&self) -> Result<Vec<User>, StorageError> {
        panic!("backend crashed during listing")
    }

    async fn update(&self, _id: &str, _patch: &UserPatch) -> Result<User, StorageError> {
        Err(StorageError::Unavailable("panicking backend".into()))
    }

    async fn delete(&self, _id: &str) -> Result<bool, StorageError> {
        Err(StorageError::Unavailable("panicking backend".into()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

struct Rig {
    router: UserRouter,
    north: Arc<ScriptedStrategy>,
    south: Arc<ScriptedStrategy>,
    north_service: Arc<RemoteUserService>,
    south_service: Arc<RemoteUserService>,
    log: CallLog,
}

fn rig() -> Rig {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let north_service = Arc::new(RemoteUserService::default());
    let south_service = Arc::new(RemoteUserService::default());
    let north = Arc::new(ScriptedStrategy::new("north", north_service.clone(), log.clone()));
    let south = Arc::new(ScriptedStrategy::new("south", south_service.clone(), log.clone()));

    let registry = StrategyRegistry::builder()
        .register(Hemisphere::North, north.clone())
        .register(Hemisphere::South, south.clone())
        .build();

    Rig {
        router: UserRouter::new(registry).with_global_uniqueness(false),
        north,
        south,
        north_service,
        south_service,
        log,
    }
}

fn user(id: &str, latitude: f64) -> User {
    User {
        id: id.into(),
        username: format!("user-{}", id),
        email: format!("{}@example.com", id),
        password: "hashed".into(),
        latitude,
        longitude: 12.5,
        browser_language: None,
    }
}

fn calls(log: &CallLog) -> Vec<String> {
    log.lock().clone()
}

fn position(log: &[String], call: &str) -> Option<usize> {
    log.iter().position(|c| c == call)
}

// =============================================================================
// Migration ordering
// =============================================================================

#[tokio::test]
async fn chaos_same_region_update_touches_one_backend() {
    let r = rig();
    r.north_service.insert_user(&user("u1", 30.0)).await.unwrap();

    r.router
        .update_user("u1", &UserPatch { latitude: Some(35.0), ..Default::default() }, Hemisphere::North, Hemisphere::North)
        .await
        .unwrap();

    assert_eq!(calls(&r.log), vec!["north.update".to_string()]);
}

#[tokio::test]
async fn chaos_flip_creates_before_deleting() {
    let r = rig();
    r.north_service.insert_user(&user("u1", 30.0)).await.unwrap();

    r.router
        .update_user("u1", &UserPatch { latitude: Some(-30.0), ..Default::default() }, Hemisphere::North, Hemisphere::South)
        .await
        .unwrap();

    let log = calls(&r.log);
    let created = position(&log, "south.create").expect("destination create");
    let deleted = position(&log, "north.delete").expect("origin delete");
    assert!(created < deleted, "create must precede delete: {:?}", log);
    assert!(position(&log, "south.delete").is_none());
    assert!(position(&log, "north.create").is_none());
}

#[tokio::test]
async fn chaos_failed_create_never_deletes_origin() {
    let r = rig();
    r.north_service.insert_user(&user("u1", 30.0)).await.unwrap();
    r.south.fail_on("create");

    let err = r
        .router
        .update_user("u1", &UserPatch { latitude: Some(-30.0), ..Default::default() }, Hemisphere::North, Hemisphere::South)
        .await
        .unwrap_err();

    assert!(matches!(err, RouterError::Backend { backend: "south", .. }));
    assert!(position(&calls(&r.log), "north.delete").is_none());
    assert_eq!(r.north_service.len(), 1);
    assert!(r.south_service.is_empty());
}

#[tokio::test]
async fn chaos_failed_delete_leaves_duplicate_and_errors() {
    let r = rig();
    r.north_service.insert_user(&user("u1", 30.0)).await.unwrap();
    r.north.fail_on("delete");

    let err = r
        .router
        .update_user("u1", &UserPatch { latitude: Some(-30.0), ..Default::default() }, Hemisphere::North, Hemisphere::South)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    // Never lost: present in both until the delete is retried
    assert_eq!(r.north_service.len(), 1);
    assert_eq!(r.south_service.len(), 1);

    let lookup = r.router.search_for_user("u1").await.unwrap();
    assert_eq!(lookup.source(), Some(Hemisphere::North));
}

#[tokio::test]
async fn chaos_delete_is_scoped_to_source() {
    let r = rig();
    r.south_service.insert_user(&user("u1", -5.0)).await.unwrap();

    assert!(r.router.delete_user("u1", Hemisphere::South).await.unwrap());
    assert_eq!(calls(&r.log), vec!["south.delete".to_string()]);
}

// =============================================================================
// Fan-out tolerance
// =============================================================================

#[tokio::test]
async fn chaos_search_fault_does_not_hide_hit() {
    let r = rig();
    r.south_service.insert_user(&user("u1", -5.0)).await.unwrap();
    r.north.fail_on("get_by_id");

    let lookup = r.router.search_for_user("u1").await.unwrap();
    assert_eq!(lookup.source(), Some(Hemisphere::South));

    let log = calls(&r.log);
    assert!(log.contains(&"north.get_by_id".to_string()));
    assert!(log.contains(&"south.get_by_id".to_string()));
}

#[tokio::test]
async fn chaos_update_by_id_with_unconfirmed_absence_is_error() {
    let r = rig();
    r.south.fail_on("get_by_id");

    let err = r
        .router
        .update_user_by_id("ghost", &UserPatch { username: Some("x".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Backend { backend: "south", .. }));
}

#[tokio::test]
async fn chaos_panicking_branch_is_tolerated() {
    let service = Arc::new(RemoteUserService::default());
    service.insert_user(&user("u1", -5.0)).await.unwrap();

    let registry = StrategyRegistry::builder()
        .register(Hemisphere::North, Arc::new(PanickingStrategy))
        .register(Hemisphere::South, Arc::new(RemoteStrategy::new(service)))
        .build();
    let router = UserRouter::new(registry);

    let lookup = router.search_for_user("u1").await.unwrap();
    assert_eq!(lookup.source(), Some(Hemisphere::South));

    let listing = router.get_all_users().await.unwrap();
    assert_eq!(listing.total_count(), 1);
    assert_eq!(listing.failed_regions, vec![Hemisphere::North]);
}

#[tokio::test]
async fn chaos_concurrent_migrations_of_distinct_users() {
    let r = rig();
    for i in 0..20 {
        r.north_service.insert_user(&user(&format!("u{:02}", i), 10.0)).await.unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..20 {
        let router = r.router.clone();
        handles.push(tokio::spawn(async move {
            router
                .update_user_by_id(&format!("u{:02}", i), &UserPatch { latitude: Some(-10.0), ..Default::default() })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(r.north_service.is_empty());
    assert_eq!(r.south_service.len(), 20);
    let listing = r.router.get_all_users().await.unwrap();
    assert_eq!(listing.total_count(), 20);
    assert_eq!(listing.users.first().map(|u| u.id.as_str()), Some("u00"));
}
