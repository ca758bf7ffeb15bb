//! Registry of described classes, interfaces and functions
//!
//! This is the container's view of type information: every constructor
//! signature, supertype relation and method the resolver may consult.

use crate::class::ClassInfo;
use crate::{Function, Instance};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

pub(crate) struct Registry {
    /// Described classes and interfaces by identifier
    classes: DashMap<String, Arc<ClassInfo>, RandomState>,
    /// Same descriptions by Rust type, for values wrapped outside the container
    by_type: DashMap<TypeId, Arc<ClassInfo>, RandomState>,
    /// Globally known functions
    functions: DashMap<String, Arc<Function>, RandomState>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            classes: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            by_type: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            functions: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Add or replace a description
    pub fn describe(&self, info: ClassInfo) -> Arc<ClassInfo> {
        let info = Arc::new(info);
        if let Some(type_id) = info.type_id() {
            self.by_type.insert(type_id, Arc::clone(&info));
        }
        self.classes.insert(info.name().to_string(), Arc::clone(&info));
        info
    }

    #[inline]
    pub fn class(&self, name: &str) -> Option<Arc<ClassInfo>> {
        self.classes.get(name).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn for_type(&self, type_id: &TypeId) -> Option<Arc<ClassInfo>> {
        self.by_type.get(type_id).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn is_described(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Whether `name` can be built without any binding
    pub fn is_instantiable(&self, name: &str) -> bool {
        self.classes
            .get(name)
            .is_some_and(|entry| entry.value().is_instantiable())
    }

    /// Whether `instance` satisfies type `name`
    pub fn satisfies(&self, instance: &Instance, name: &str) -> bool {
        if instance.class().is_a(name) {
            return true;
        }
        // Values wrapped with `Instance::new` carry bare metadata; fall back
        // to whatever was described for their Rust type.
        self.for_type(&instance.value_type_id())
            .is_some_and(|info| info.is_a(name))
    }

    /// Rewrap an instance with the registered metadata of its Rust type
    pub fn enrich(&self, instance: Instance) -> Instance {
        match self.for_type(&instance.value_type_id()) {
            Some(info) if instance.class().name() != info.name() => {
                Instance::with_class(instance.erased(), info)
            }
            _ => instance,
        }
    }

    pub fn define_function(&self, name: String, function: Function) {
        self.functions.insert(name, Arc::new(function));
    }

    #[inline]
    pub fn function(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
