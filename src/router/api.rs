// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Read and create paths:
//! - `search_for_user()` / `get_user_by_id()` - fan-out lookup with provenance
//! - `get_all_users()` - merged listing across every backend
//! - `create_user()` / `create_new_user()` - routed insert

use tracing::{debug, info, instrument, warn};

use crate::geo::{classify, Hemisphere};
use crate::metrics;
use crate::user::{NewUser, User, UserSummary};

use super::{RouterError, UserListing, UserLookup, UserRouter};

impl UserRouter {
    /// Look a user up in every backend at once.
    ///
    /// Waits for all backends, then returns the first hit in registration
    /// order tagged with the hemisphere it came from. A failing backend does not
    /// hide a hit from another one.
    ///
    /// # Returns
    /// - `Found { user, source }` → some backend holds the id
    /// - `NotFound` → every backend answered and none holds it
    /// - `Err(_)` → no hit, and at least one backend failed, so absence is unconfirmed
    #[instrument(skip(self))]
    pub async fn search_for_user(&self, id: &str) -> Result<UserLookup, RouterError> {
        let key = id.to_string();
        let branches = self
            .fan_out("search", move |strategy| {
                let key = key.clone();
                async move { strategy.get_by_id(&key).await }
            })
            .await;

        let mut hit: Option<(User, Hemisphere)> = None;
        let mut first_fault: Option<RouterError> = None;

        for branch in branches {
            match branch.result {
                Ok(Some(user)) => {
                    if let Some(kept) = hit.as_ref().map(|(_, region)| *region) {
                        // Expected only inside a migration window
                        warn!(id, kept = %kept, also = %branch.region, "User present in more than one backend");
                    } else {
                        hit = Some((user, branch.region));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    Self::note_fault("search", branch.region, branch.backend, &e);
                    if first_fault.is_none() {
                        first_fault = Some(RouterError::from_storage(branch.backend, e));
                    }
                }
            }
        }

        match (hit, first_fault) {
            (Some((user, source)), _) => {
                debug!(id, source = %source, "User located");
                Ok(UserLookup::Found { user, source })
            }
            (None, Some(fault)) => Err(fault),
            (None, None) => Ok(UserLookup::NotFound),
        }
    }

    /// The user record alone, without provenance.
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, RouterError> {
        Ok(self.search_for_user(id).await?.into_user())
    }

    /// Every user from every backend, sorted by id.
    ///
    /// Ids are compared as plain strings. With UUID ids that is a stable order,
    /// not creation order. A backend that fails is skipped and named in
    /// [`UserListing::failed_regions`]; only when all of them fail is an error
    /// returned.
    #[instrument(skip(self))]
    pub async fn get_all_users(&self) -> Result<UserListing, RouterError> {
        let branches = self
            .fan_out("get_all", |strategy| async move { strategy.get_all().await })
            .await;

        let mut listing = UserListing::default();
        let mut first_fault: Option<RouterError> = None;
        let attempted = branches.len();

        for branch in branches {
            match branch.result {
                Ok(mut users) => listing.users.append(&mut users),
                Err(e) => {
                    Self::note_fault("get_all", branch.region, branch.backend, &e);
                    listing.failed_regions.push(branch.region);
                    if first_fault.is_none() {
                        first_fault = Some(RouterError::from_storage(branch.backend, e));
                    }
                }
            }
        }

        if attempted > 0 && listing.failed_regions.len() == attempted {
            if let Some(fault) = first_fault {
                return Err(fault);
            }
        }

        listing.users.sort_by(|a, b| a.id.cmp(&b.id));
        metrics::set_listing_size(listing.users.len());
        debug!(count = listing.users.len(), failed = ?listing.failed_regions, "Merged user listing");
        Ok(listing)
    }

    /// Store a user in the backend owning its coordinates.
    ///
    /// With global uniqueness enforced (the default), the other hemispheres are
    /// checked for a clashing id, username or email first; the owning backend
    /// enforces its own constraints either way.
    #[instrument(skip(self, user), fields(id = %user.id))]
    pub async fn create_user(&self, user: User) -> Result<User, RouterError> {
        let (hemisphere, strategy) = self.resolve_strategy(user.latitude, user.longitude)?;

        if self.enforce_global_uniqueness {
            self.ensure_unique_elsewhere(
                hemisphere,
                &user.id,
                Some(&user.username),
                Some(&user.email),
                true,
            )
            .await?;
        }

        let stored = strategy
            .create(&user)
            .await
            .map_err(|e| RouterError::from_storage(strategy.backend(), e))?;

        info!(id = %stored.id, region = %hemisphere, backend = strategy.backend(), "User created");
        Ok(stored)
    }

    /// Validate a draft, give it a fresh id and create it.
    pub async fn create_new_user(&self, draft: NewUser) -> Result<UserSummary, RouterError> {
        draft.validate()?;
        // Reject bad coordinates before an id is minted
        classify(draft.latitude, draft.longitude)?;

        let created = self.create_user(draft.into_user()).await?;
        Ok(created.summary())
    }

    /// Reject identity fields already held by a record in another hemisphere.
    ///
    /// `claim_id` also rejects a record elsewhere with the same id (creates);
    /// otherwise that record is treated as the caller's own copy and skipped.
    pub(super) async fn ensure_unique_elsewhere(
        &self,
        owner: Hemisphere,
        id: &str,
        username: Option<&str>,
        email: Option<&str>,
        claim_id: bool,
    ) -> Result<(), RouterError> {
        for (region, strategy) in self.registry.iter().filter(|(region, _)| *region != owner) {
            let existing = strategy
                .get_all()
                .await
                .map_err(|e| RouterError::from_storage(strategy.backend(), e))?;

            for other in &existing {
                let field = if other.id == id {
                    if !claim_id {
                        continue;
                    }
                    "id"
                } else if username == Some(other.username.as_str()) {
                    "username"
                } else if email == Some(other.email.as_str()) {
                    "email"
                } else {
                    continue;
                };
                debug!(region = %region, field, "Write rejected by another hemisphere");
                return Err(RouterError::UniqueConstraintViolation(format!(
                    "{} already exists in hemisphere {}",
                    field, region
                )));
            }
        }
        Ok(())
    }
}
