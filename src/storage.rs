//! Definition store and singleton registry
//!
//! Uses DashMap for lock-free concurrent access.

use crate::definition::Registered;
use crate::Instance;
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Thread-safe storage for definitions and cached singletons
pub(crate) struct DefinitionStore {
    /// Map from identifier to its recipe
    definitions: DashMap<String, Arc<Registered>, RandomState>,
    /// Singleton markers; the cell is filled once the instance has been built
    singletons: DashMap<String, Arc<OnceCell<Instance>>, RandomState>,
}

impl DefinitionStore {
    /// Create with pre-allocated capacity.
    ///
    /// Shards scale with the expected capacity; the DashMap default of
    /// `num_cpus * 4` is far more than a container with a few dozen
    /// identifiers needs.
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            definitions: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            singletons: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// Register a transient definition; drops any singleton marker
    pub fn set(&self, id: String, entry: Registered) {
        self.singletons.remove(&id);
        self.definitions.insert(id, Arc::new(entry));
    }

    /// Register a singleton definition; any cached instance is forgotten
    pub fn set_singleton(&self, id: String, entry: Registered) {
        self.definitions.insert(id.clone(), Arc::new(entry));
        self.singletons.insert(id, Arc::new(OnceCell::new()));
    }

    #[inline]
    pub fn lookup(&self, id: &str) -> Option<Arc<Registered>> {
        self.definitions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn is_singleton(&self, id: &str) -> bool {
        self.singletons.contains_key(id)
    }

    #[inline]
    pub fn cached(&self, id: &str) -> Option<Instance> {
        self.singletons.get(id).and_then(|slot| slot.get().cloned())
    }

    /// Cache a freshly built singleton.
    ///
    /// The first instance stored wins; a racing builder gets the stored one
    /// back. Nothing is cached when `id` is no longer a singleton.
    pub fn cache(&self, id: &str, instance: Instance) -> Instance {
        let cell = self.singletons.get(id).map(|slot| Arc::clone(slot.value()));
        match cell {
            Some(cell) => cell.get_or_init(|| instance).clone(),
            None => instance,
        }
    }

    #[inline]
    pub fn has(&self, id: &str) -> bool {
        self.definitions.contains_key(id) || self.singletons.contains_key(id)
    }

    pub fn has_singleton(&self, id: &str, check_instance: bool) -> bool {
        match self.singletons.get(id) {
            Some(slot) => !check_instance || slot.get().is_some(),
            None => false,
        }
    }

    /// Forget the definition and any singleton state for `id`
    pub fn clear(&self, id: &str) {
        self.definitions.remove(id);
        self.singletons.remove(id);
    }

    /// Drop every cached instance, keeping definitions and markers
    pub fn reset(&self) {
        for mut slot in self.singletons.iter_mut() {
            *slot.value_mut() = Arc::new(OnceCell::new());
        }
    }

    /// Every registered identifier, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .definitions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl std::fmt::Debug for DefinitionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionStore")
            .field("definitions", &self.definitions.len())
            .field("singletons", &self.singletons.len())
            .finish()
    }
}
