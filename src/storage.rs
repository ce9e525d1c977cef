//! Concurrent storage for bindings and resolved instances
//!
//! Uses DashMap keyed by service id for lock-free concurrent access.

use crate::binding::{Binding, ServiceId};
use crate::value::Value;
use ahash::RandomState;
use dashmap::DashMap;

/// Create a map with 8 shards.
///
/// Default DashMap uses num_cpus * 4 shards which is overkill for
/// typical containers with <50 services.
#[inline]
fn new_map<V>() -> DashMap<String, V, RandomState> {
    DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8)
}

/// Thread-safe storage for service bindings
pub struct BindingStorage {
    bindings: DashMap<ServiceId, Binding, RandomState>,
}

impl BindingStorage {
    #[inline]
    pub fn new() -> Self {
        Self { bindings: new_map() }
    }

    /// Insert or replace a binding
    #[inline]
    pub fn insert(&self, id: ServiceId, binding: Binding) -> Option<Binding> {
        self.bindings.insert(id, binding)
    }

    /// Clone a binding out of storage so no shard lock is held while building
    #[inline]
    pub fn get(&self, id: &str) -> Option<Binding> {
        self.bindings.get(id).map(|b| b.value().clone())
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.bindings.contains_key(id)
    }

    /// Mutate a binding in place. Returns false if the id is unbound.
    #[inline]
    pub fn update<F: FnOnce(&mut Binding)>(&self, id: &str, f: F) -> bool {
        match self.bindings.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// All bindings sorted by id
    pub fn snapshot(&self) -> Vec<(ServiceId, Binding)> {
        let mut all: Vec<_> = self
            .bindings
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for BindingStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingStorage")
            .field("count", &self.len())
            .finish()
    }
}

/// Cache of resolved values keyed by id.
///
/// Used for shared service instances, private instances of invokable
/// classes, and container parameters.
pub struct InstanceCache {
    values: DashMap<String, Value, RandomState>,
}

impl InstanceCache {
    #[inline]
    pub fn new() -> Self {
        Self { values: new_map() }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Store `value` unless another caller stored first; returns whichever won
    #[inline]
    pub fn insert_if_absent(&self, key: &str, value: Value) -> Value {
        self.values
            .entry(key.to_string())
            .or_insert(value)
            .value()
            .clone()
    }

    #[inline]
    pub fn replace(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    #[inline]
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.remove(key).map(|(_, v)| v)
    }

    #[inline]
    pub fn clear(&self) {
        self.values.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// All entries sorted by key
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let mut all: Vec<_> = self
            .values
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCache")
            .field("count", &self.len())
            .finish()
    }
}
