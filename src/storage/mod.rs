// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backend adapters.
//!
//! - [`sql::SqlUserStore`]: the local relational table (SQLite or MySQL via sqlx `Any`)
//! - [`remote::RemoteUserService`]: the remote user service, mocked in-process
//!
//! Both are wrapped by the strategies in [`crate::strategy`], which give them the
//! common [`traits::UserStorageStrategy`] shape.

pub mod traits;
pub mod sql;
pub mod remote;

pub use traits::{RunResult, StorageError, UserStorageStrategy};
