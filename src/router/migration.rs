// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Update and delete paths, including cross-backend migration.
//!
//! A record changes backend only when an update moves it across the equator.
//! The move is two steps with no shared transaction:
//!
//! ```text
//! origin.get_by_id ─→ merge patch ─→ destination.create ─→ origin.delete
//!                                          │                     │
//!                                   fails: stop, origin     fails: both copies
//!                                   untouched               exist until retried
//! ```
//!
//! The destination write is always confirmed before the origin copy is deleted,
//! so a failure never loses the record. A concurrent lookup during the window may
//! see it in both backends or, while the create is in flight, only in the origin.

use tracing::{error, info, instrument, warn};

use crate::geo::{classify, Hemisphere};
use crate::metrics;
use crate::user::{UserPatch, UserSummary};

use super::{RouterError, UserLookup, UserRouter};

impl UserRouter {
    /// Update a user whose current backend is already known.
    ///
    /// `current_source` comes from a prior [`search_for_user`](Self::search_for_user);
    /// `new_region` is the hemisphere of the coordinates the record will have after
    /// the patch. Equal tags update in place, different tags migrate. Either way
    /// the caller gets the same `{id, username, email}` projection back.
    ///
    /// A migration whose patched coordinates do not classify to `new_region`
    /// fails with [`RouterError::InvalidCoordinates`] before anything is written.
    #[instrument(skip(self, patch))]
    pub async fn update_user(
        &self,
        id: &str,
        patch: &UserPatch,
        current_source: Hemisphere,
        new_region: Hemisphere,
    ) -> Result<UserSummary, RouterError> {
        if current_source == new_region {
            let strategy = self.strategy_for(current_source)?;
            if self.enforce_global_uniqueness && (patch.username.is_some() || patch.email.is_some()) {
                self.ensure_unique_elsewhere(
                    current_source,
                    id,
                    patch.username.as_deref(),
                    patch.email.as_deref(),
                    false,
                )
                .await?;
            }
            let updated = strategy
                .update(id, patch)
                .await
                .map_err(|e| RouterError::from_storage(strategy.backend(), e))?;
            info!(id, region = %current_source, "User updated in place");
            return Ok(updated.summary());
        }

        self.migrate(id, patch, current_source, new_region).await
    }

    async fn migrate(
        &self,
        id: &str,
        patch: &UserPatch,
        from: Hemisphere,
        to: Hemisphere,
    ) -> Result<UserSummary, RouterError> {
        let origin = self.strategy_for(from)?;
        let destination = self.strategy_for(to)?;

        let mut record = origin
            .get_by_id(id)
            .await
            .map_err(|e| RouterError::from_storage(origin.backend(), e))?
            .ok_or_else(|| RouterError::NotFound(id.to_string()))?;
        record.apply(patch);

        if classify(record.latitude, record.longitude)? != to {
            return Err(RouterError::InvalidCoordinates {
                latitude: record.latitude,
                longitude: record.longitude,
            });
        }

        let created = match destination.create(&record).await {
            Ok(created) => created,
            Err(e) => {
                metrics::record_migration(from.as_str(), to.as_str(), "create_failed");
                warn!(id, from = %from, to = %to, error = %e, "Migration aborted, origin copy kept");
                return Err(RouterError::from_storage(destination.backend(), e));
            }
        };

        match origin.delete(id).await {
            Ok(removed) => {
                if !removed {
                    warn!(id, from = %from, "Origin copy was already gone when migration finished");
                }
                metrics::record_migration(from.as_str(), to.as_str(), "success");
                info!(id, from = %from, to = %to, "User migrated");
                Ok(created.summary())
            }
            Err(e) => {
                metrics::record_migration(from.as_str(), to.as_str(), "delete_failed");
                error!(
                    id,
                    from = %from,
                    to = %to,
                    error = %e,
                    "Migration wrote the new copy but could not delete the old one; user is duplicated"
                );
                Err(RouterError::from_storage(origin.backend(), e))
            }
        }
    }

    /// Delete from the backend named by `source` only.
    ///
    /// Idempotent: returns whether a record was actually removed, so a stale
    /// `source` and a missing id both come back as `false`.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str, source: Hemisphere) -> Result<bool, RouterError> {
        let strategy = self.strategy_for(source)?;
        let removed = strategy
            .delete(id)
            .await
            .map_err(|e| RouterError::from_storage(strategy.backend(), e))?;
        info!(id, region = %source, removed, "User delete");
        Ok(removed)
    }

    /// Locate the user, work out the hemisphere of the patched coordinates and
    /// update or migrate accordingly.
    pub async fn update_user_by_id(&self, id: &str, patch: &UserPatch) -> Result<UserSummary, RouterError> {
        let (user, source) = match self.search_for_user(id).await? {
            UserLookup::Found { user, source } => (user, source),
            UserLookup::NotFound => return Err(RouterError::NotFound(id.to_string())),
        };

        let (latitude, longitude) = patch.target_coordinates(&user);
        let new_region = classify(latitude, longitude)?;

        self.update_user(id, patch, source, new_region).await
    }

    /// Locate the user and delete it where it lives. `false` if no backend has it.
    pub async fn delete_user_by_id(&self, id: &str) -> Result<bool, RouterError> {
        match self.search_for_user(id).await? {
            UserLookup::Found { source, .. } => self.delete_user(id, source).await,
            UserLookup::NotFound => Ok(false),
        }
    }
}
