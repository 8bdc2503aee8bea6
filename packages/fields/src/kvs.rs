//! The backing key-value store contract and an in-memory implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use courseware_keys::UsageId;

use crate::scope::FieldKey;
use crate::value::Value;

/// The synchronous key-value dependency beneath the runtime.
///
/// The store may be shared or pooled across requests; any cross-request
/// consistency or locking is the store's responsibility, not this crate's.
/// Besides `get`/`set` it answers two explicit questions:
///
/// - [`has`](KeyValueStore::has): has an override been set for this key?
///   This is distinct from `get` returning a default-shaped value.
/// - [`inherited`](KeyValueStore::inherited): the value a field inherits
///   from the nearest ancestor in the course tree, when the store computes
///   inheritance. Stores without inheritance return `None`.
///
/// # Object Safety
///
/// This trait is object-safe: the usual handle is
/// [`SharedKvs`] (`Arc<Mutex<dyn KeyValueStore + Send>>`).
pub trait KeyValueStore: Send {
    fn get(&self, key: &FieldKey) -> Option<Value>;

    fn set(&mut self, key: FieldKey, value: Value);

    /// Remove an override. Returns whether one was present.
    fn delete(&mut self, key: &FieldKey) -> bool;

    /// Whether an override has been explicitly set for this key.
    fn has(&self, key: &FieldKey) -> bool;

    /// Value inherited from the nearest ancestor, if the store tracks it.
    fn inherited(&self, _usage: &UsageId, _field: &str) -> Option<Value> {
        None
    }
}

/// Shared handle to a backing store.
pub type SharedKvs = Arc<Mutex<dyn KeyValueStore + Send>>;

/// BTreeMap-backed store with a seedable inherited-settings side table.
#[derive(Default)]
pub struct MemoryKvs {
    data: BTreeMap<FieldKey, Value>,
    inherited: BTreeMap<(UsageId, String), Value>,
}

impl MemoryKvs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into the shared handle form.
    pub fn shared(self) -> SharedKvs {
        Arc::new(Mutex::new(self))
    }

    /// Seed an inherited setting for a usage, as a tree-aware store would.
    pub fn set_inherited(&mut self, usage: UsageId, field: impl Into<String>, value: Value) {
        self.inherited.insert((usage, field.into()), value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for MemoryKvs {
    fn get(&self, key: &FieldKey) -> Option<Value> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: FieldKey, value: Value) {
        self.data.insert(key, value);
    }

    fn delete(&mut self, key: &FieldKey) -> bool {
        self.data.remove(key).is_some()
    }

    fn has(&self, key: &FieldKey) -> bool {
        self.data.contains_key(key)
    }

    fn inherited(&self, usage: &UsageId, field: &str) -> Option<Value> {
        self.inherited
            .get(&(usage.clone(), field.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use courseware_keys::CourseKey;

    fn usage() -> UsageId {
        let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
        UsageId::new(course, "problem", "quiz_1").unwrap()
    }

    #[test]
    fn set_get_has_delete() {
        let mut kvs = MemoryKvs::new();
        let key = FieldKey::new(Scope::Settings, usage(), "display_name");

        assert!(!kvs.has(&key));
        assert_eq!(kvs.get(&key), None);

        kvs.set(key.clone(), Value::from("Quiz"));
        assert!(kvs.has(&key));
        assert_eq!(kvs.get(&key), Some(Value::from("Quiz")));

        assert!(kvs.delete(&key));
        assert!(!kvs.has(&key));
        assert!(!kvs.delete(&key));
    }

    #[test]
    fn user_state_keys_are_separate() {
        let mut kvs = MemoryKvs::new();
        let alice = FieldKey::for_user(Scope::UserState, usage(), "position", "alice");
        let bob = FieldKey::for_user(Scope::UserState, usage(), "position", "bob");

        kvs.set(alice.clone(), Value::Integer(3));
        assert_eq!(kvs.get(&alice), Some(Value::Integer(3)));
        assert_eq!(kvs.get(&bob), None);
    }

    #[test]
    fn inherited_side_table() {
        let mut kvs = MemoryKvs::new();
        assert_eq!(kvs.inherited(&usage(), "graded"), None);

        kvs.set_inherited(usage(), "graded", Value::Bool(true));
        assert_eq!(kvs.inherited(&usage(), "graded"), Some(Value::Bool(true)));

        // inherited values are not overrides
        let key = FieldKey::new(Scope::Settings, usage(), "graded");
        assert!(!kvs.has(&key));
    }
}
