// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! User record types.
//!
//! A [`User`] is the unit that flows through the router. Both backends store the
//! same shape; which one holds a given record depends only on its coordinates.
//!
//! # Example
//!
//! ```
//! use hemisphere_store::{NewUser, UserPatch};
//!
//! let draft = NewUser {
//!     username: "ausie".into(),
//!     email: "ausie@example.com".into(),
//!     password: "$2b$10$hash".into(),
//!     latitude: -33.8688,
//!     longitude: 151.2093,
//!     browser_language: Some("en-AU".into()),
//! };
//! draft.validate().unwrap();
//!
//! let mut user = draft.into_user();
//! assert_eq!(user.id.len(), 36);
//!
//! user.apply(&UserPatch { latitude: Some(40.0), ..Default::default() });
//! assert_eq!(user.latitude, 40.0);
//!
//! // Passwords never show up in debug output
//! assert!(!format!("{:?}", user).contains("$2b$10$hash"));
//! ```

use serde::{Deserialize, Serialize};

use crate::router::RouterError;

const REDACTED: &str = "[REDACTED]";

/// A stored user record.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier (UUID v4 when generated here)
    pub id: String,
    /// Unique across both backends
    pub username: String,
    /// Unique across both backends
    pub email: String,
    /// Credential, already hashed by the caller
    pub password: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_language: Option<String>,
}

impl User {
    /// Merge a patch over this record. Fields absent from the patch are kept.
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(ref username) = patch.username {
            self.username = username.clone();
        }
        if let Some(ref email) = patch.email {
            self.email = email.clone();
        }
        if let Some(ref password) = patch.password {
            self.password = password.clone();
        }
        if let Some(latitude) = patch.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            self.longitude = longitude;
        }
        if let Some(ref language) = patch.browser_language {
            self.browser_language = Some(language.clone());
        }
    }

    /// Minimal projection handed back to callers after writes.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("browser_language", &self.browser_language)
            .finish()
    }
}

/// A user that has not been assigned an id yet.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub browser_language: Option<String>,
}

impl NewUser {
    /// Check the required text fields are present.
    ///
    /// Coordinates are checked separately by [`crate::classify`].
    pub fn validate(&self) -> Result<(), RouterError> {
        let missing: Vec<&'static str> = [
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RouterError::MissingFields(missing))
        }
    }

    /// Assign a fresh UUID v4 and produce a storable record.
    #[must_use]
    pub fn into_user(self) -> User {
        self.with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Produce a storable record with a caller-chosen id.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> User {
        User {
            id: id.into(),
            username: self.username,
            email: self.email,
            password: self.password,
            latitude: self.latitude,
            longitude: self.longitude,
            browser_language: self.browser_language,
        }
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("browser_language", &self.browser_language)
            .finish()
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub browser_language: Option<String>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.browser_language.is_none()
    }

    /// Coordinates the record will have once this patch is applied.
    #[must_use]
    pub fn target_coordinates(&self, current: &User) -> (f64, f64) {
        (
            self.latitude.unwrap_or(current.latitude),
            self.longitude.unwrap_or(current.longitude),
        )
    }
}

impl std::fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPatch")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("browser_language", &self.browser_language)
            .finish()
    }
}

/// `{id, username, email}` projection, identical whichever path an update took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}
