// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the user router.

use thiserror::Error;

use crate::geo::Hemisphere;
use crate::storage::StorageError;
use crate::user::User;

/// Errors surfaced by [`super::UserRouter`].
///
/// Absence is not an error at this layer: lookups return
/// [`UserLookup::NotFound`]. `NotFound` here means an operation needed a
/// record that is not there.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("User '{0}' not found")]
    NotFound(String),

    #[error("Username or email already exists: {0}")]
    UniqueConstraintViolation(String),

    #[error("Coordinates are invalid: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("No storage strategy registered for hemisphere {0}")]
    UnroutableRegion(Hemisphere),

    #[error("Backend '{backend}' failed: {error}")]
    Backend {
        backend: &'static str,
        #[source]
        error: StorageError,
    },
}

impl RouterError {
    /// Lift a storage error, keeping conflicts and not-found distinct from faults.
    pub fn from_storage(backend: &'static str, error: StorageError) -> Self {
        match error {
            StorageError::UniqueViolation(message) => Self::UniqueConstraintViolation(message),
            StorageError::NotFound(id) => Self::NotFound(id),
            error => Self::Backend { backend, error },
        }
    }

    /// HTTP-style status for the boundary layer.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::UniqueConstraintViolation(_) => 409,
            Self::InvalidCoordinates { .. } | Self::MissingFields(_) => 400,
            Self::UnroutableRegion(_) | Self::Backend { .. } => 500,
        }
    }

    /// Stable machine-readable code for error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UniqueConstraintViolation(_) => "CONFLICT",
            Self::InvalidCoordinates { .. } => "INVALID_COORDINATES",
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::UnroutableRegion(_) => "UNROUTABLE_REGION",
            Self::Backend { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Validation failures are never worth retrying.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidCoordinates { .. } | Self::MissingFields(_))
    }
}

/// Result of a fan-out lookup, carrying provenance on a hit.
#[derive(Debug, Clone, PartialEq)]
pub enum UserLookup {
    /// Found in the backend owning `source`
    Found { user: User, source: Hemisphere },
    /// No backend holds the id (and none of them failed)
    NotFound,
}

impl UserLookup {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Found { user, .. } => Some(user),
            Self::NotFound => None,
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<Hemisphere> {
        match self {
            Self::Found { source, .. } => Some(*source),
            Self::NotFound => None,
        }
    }

    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::Found { user, .. } => Some(user),
            Self::NotFound => None,
        }
    }
}

impl std::fmt::Display for UserLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found { user, source } => write!(f, "Found({} in {})", user.id, source),
            Self::NotFound => write!(f, "NotFound"),
        }
    }
}

/// Merged listing across every backend.
///
/// `users` is sorted by id using plain string ordering. Ids are opaque (UUID
/// v4 when generated here), so the order is stable but not chronological.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserListing {
    pub users: Vec<User>,
    /// Hemispheres whose backend failed and whose records are missing here
    pub failed_regions: Vec<Hemisphere>,
}

impl UserListing {
    /// Value for an `X-Total-Count` style header.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.users.len()
    }

    /// `true` when every backend contributed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            username: "u".into(),
            email: "u@example.com".into(),
            password: "p".into(),
            latitude: 1.0,
            longitude: 1.0,
            browser_language: None,
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RouterError::NotFound("x".into()).status_code(), 404);
        assert_eq!(RouterError::UniqueConstraintViolation("x".into()).status_code(), 409);
        assert_eq!(
            RouterError::InvalidCoordinates { latitude: 91.0, longitude: 0.0 }.status_code(),
            400
        );
        assert_eq!(RouterError::MissingFields(vec!["email"]).status_code(), 400);
        assert_eq!(RouterError::UnroutableRegion(Hemisphere::South).status_code(), 500);
        assert_eq!(
            RouterError::Backend { backend: "sql", error: StorageError::Backend("boom".into()) }
                .status_code(),
            500
        );
    }

    #[test]
    fn test_from_storage_mapping() {
        assert_eq!(
            RouterError::from_storage("sql", StorageError::UniqueViolation("dup".into())),
            RouterError::UniqueConstraintViolation("dup".into())
        );
        assert_eq!(
            RouterError::from_storage("remote", StorageError::NotFound("u-1".into())),
            RouterError::NotFound("u-1".into())
        );
        let fault = RouterError::from_storage("remote", StorageError::Unavailable("down".into()));
        assert_eq!(fault.code(), "INTERNAL_SERVER_ERROR");
        assert!(fault.to_string().contains("remote"));
    }

    #[test]
    fn test_missing_fields_message() {
        let err = RouterError::MissingFields(vec!["username", "email"]);
        assert_eq!(err.to_string(), "Missing required fields: username, email");
        assert!(err.is_validation());
    }

    #[test]
    fn test_lookup_accessors() {
        let found = UserLookup::Found { user: user("u-1"), source: Hemisphere::South };
        assert!(found.is_found());
        assert_eq!(found.source(), Some(Hemisphere::South));
        assert_eq!(found.user().map(|u| u.id.as_str()), Some("u-1"));
        assert_eq!(format!("{}", found), "Found(u-1 in S)");

        assert!(!UserLookup::NotFound.is_found());
        assert_eq!(UserLookup::NotFound.source(), None);
        assert_eq!(UserLookup::NotFound.into_user(), None);
    }

    #[test]
    fn test_listing_completeness() {
        let listing = UserListing { users: vec![user("a"), user("b")], failed_regions: vec![] };
        assert!(listing.is_complete());
        assert_eq!(listing.total_count(), 2);

        let partial = UserListing { users: vec![], failed_regions: vec![Hemisphere::North] };
        assert!(!partial.is_complete());
    }
}
