// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hemisphere → strategy mapping.
//!
//! Built once through [`RegistryBuilder`] and never mutated afterwards, so the
//! router can share it across tasks without locking. Registration order is
//! kept: fan-out lookups prefer earlier entries when more than one backend hits.

use std::sync::Arc;

use crate::geo::Hemisphere;
use crate::storage::UserStorageStrategy;

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<(Hemisphere, Arc<dyn UserStorageStrategy>)>,
}

impl StrategyRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, hemisphere: Hemisphere) -> Option<&Arc<dyn UserStorageStrategy>> {
        self.entries
            .iter()
            .find(|(tag, _)| *tag == hemisphere)
            .map(|(_, strategy)| strategy)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Hemisphere, &Arc<dyn UserStorageStrategy>)> {
        self.entries.iter().map(|(tag, strategy)| (*tag, strategy))
    }

    #[must_use]
    pub fn regions(&self) -> Vec<Hemisphere> {
        self.entries.iter().map(|(tag, _)| *tag).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every hemisphere has a strategy.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        Hemisphere::ALL.iter().all(|h| self.get(*h).is_some())
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(tag, s)| (tag.as_str(), s.backend())))
            .finish()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<(Hemisphere, Arc<dyn UserStorageStrategy>)>,
}

impl RegistryBuilder {
    /// Register a strategy. Re-registering a hemisphere replaces its strategy
    /// but keeps its original position.
    #[must_use]
    pub fn register(mut self, hemisphere: Hemisphere, strategy: Arc<dyn UserStorageStrategy>) -> Self {
        match self.entries.iter_mut().find(|(tag, _)| *tag == hemisphere) {
            Some(entry) => entry.1 = strategy,
            None => self.entries.push((hemisphere, strategy)),
        }
        self
    }

    #[must_use]
    pub fn build(self) -> StrategyRegistry {
        StrategyRegistry { entries: self.entries }
    }
}
