// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage strategies: one [`UserStorageStrategy`](crate::storage::UserStorageStrategy)
//! implementation per backend, plus the registry the router routes through.
//!
//! | Hemisphere | Strategy           | Adapter                |
//! |------------|--------------------|------------------------|
//! | North      | [`LocalStrategy`]  | `SqlUserStore`         |
//! | South      | [`RemoteStrategy`] | `RemoteUserService`    |

mod local;
mod remote;
pub mod registry;

pub use local::LocalStrategy;
pub use remote::RemoteStrategy;
pub use registry::{RegistryBuilder, StrategyRegistry};
