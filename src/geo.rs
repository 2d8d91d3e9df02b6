// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hemisphere classification.
//!
//! Every record is owned by exactly one backend, and the owner is derived from
//! the record's coordinates alone:
//!
//! ```text
//! latitude  ∈ [0, 90]    ─→ North  (local SQL store)
//! latitude  ∈ [-90, 0)   ─→ South  (remote service)
//! longitude ∉ [-180, 180] or latitude out of range ─→ InvalidCoordinates
//! ```
//!
//! Longitude takes part in validation only. It never moves a record.
//!
//! # Example
//!
//! ```
//! use hemisphere_store::{classify, Hemisphere};
//!
//! assert_eq!(classify(45.0, -73.0).unwrap(), Hemisphere::North);
//! assert_eq!(classify(-33.86, 151.2).unwrap(), Hemisphere::South);
//! assert!(classify(91.0, 0.0).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::router::RouterError;

/// Region tag deciding which backend owns a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hemisphere {
    /// Latitude in `[0, 90]`
    #[serde(rename = "N")]
    North,
    /// Latitude in `[-90, 0)`
    #[serde(rename = "S")]
    South,
}

impl Hemisphere {
    /// All tags, in registry order.
    pub const ALL: [Hemisphere; 2] = [Hemisphere::North, Hemisphere::South];

    /// Short tag used in logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::South => "S",
        }
    }
}

impl std::fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn valid_longitude(longitude: f64) -> bool {
    (-180.0..=180.0).contains(&longitude)
}

/// Classify a coordinate pair into its owning hemisphere.
///
/// Fails with [`RouterError::InvalidCoordinates`] when latitude is outside
/// `[-90, 90]` or longitude is outside `[-180, 180]`. NaN fails both ranges.
pub fn classify(latitude: f64, longitude: f64) -> Result<Hemisphere, RouterError> {
    if (0.0..=90.0).contains(&latitude) && valid_longitude(longitude) {
        Ok(Hemisphere::North)
    } else if latitude < 0.0 && latitude >= -90.0 && valid_longitude(longitude) {
        Ok(Hemisphere::South)
    } else {
        Err(RouterError::InvalidCoordinates { latitude, longitude })
    }
}
