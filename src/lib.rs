// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Hemisphere Store
//!
//! User storage split across two backends by the sign of the user's latitude.
//! Callers create, read, update and delete "a user" and never learn where it lives.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         UserRouter                          │
//! │  • classify(lat, lon) → North | South                       │
//! │  • fan-out lookups with provenance                          │
//! │  • merged, id-sorted listings                               │
//! │  • create-then-delete migration on hemisphere change        │
//! └─────────────────────────────────────────────────────────────┘
//!                │                               │
//!                ▼                               ▼
//! ┌──────────────────────────────┐ ┌──────────────────────────────┐
//! │  North: LocalStrategy        │ │  South: RemoteStrategy       │
//! │  SqlUserStore (SQLite/MySQL) │ │  RemoteUserService (mock)    │
//! └──────────────────────────────┘ └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hemisphere_store::{NewUser, RouterConfig, UserPatch, UserRouter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = UserRouter::connect(&RouterConfig::default()).await?;
//!
//!     let created = router.create_new_user(NewUser {
//!         username: "alice".into(),
//!         email: "alice@example.com".into(),
//!         password: "$2b$10$hash".into(),
//!         latitude: 45.0,
//!         longitude: -73.0,
//!         browser_language: Some("en-CA".into()),
//!     }).await?;
//!
//!     // Crossing the equator moves the record to the remote service
//!     router.update_user_by_id(&created.id, &UserPatch {
//!         latitude: Some(-10.0),
//!         ..Default::default()
//!     }).await?;
//!
//!     let listing = router.get_all_users().await?;
//!     println!("{} users", listing.total_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`geo`]: hemisphere classification
//! - [`user`]: record, draft, patch and summary types
//! - [`storage`]: backend adapters and the strategy trait
//! - [`strategy`]: per-backend strategies and the registry
//! - [`router`]: the routing and migration engine
//! - [`resilience`]: startup retry for adapters

pub mod config;
pub mod geo;
pub mod user;
pub mod storage;
pub mod strategy;
pub mod router;
pub mod resilience;
pub mod metrics;

pub use config::RouterConfig;
pub use geo::{classify, Hemisphere};
pub use user::{NewUser, User, UserPatch, UserSummary};
pub use storage::{StorageError, UserStorageStrategy};
pub use storage::sql::{SqlStoreOptions, SqlUserStore};
pub use storage::remote::RemoteUserService;
pub use strategy::{LocalStrategy, RemoteStrategy, StrategyRegistry};
pub use router::{RouterError, UserListing, UserLookup, UserRouter};
pub use resilience::retry::RetryConfig;
pub use metrics::LatencyTimer;
