//! The per-block caching view over a shared key-value store.

use std::collections::{BTreeMap, BTreeSet};

use courseware_keys::UsageId;

use crate::kvs::SharedKvs;
use crate::scope::FieldKey;
use crate::value::Value;

/// Field access for one block instance.
///
/// Reads check the local cache first, then the backing store. Writes land
/// in the cache and mark the key dirty; the backing store sees nothing
/// until [`save`](FieldData::save). That save-point is explicit by design:
/// whoever hands the backing store to persistence code must call `save`
/// first, and [`is_dirty`](FieldData::is_dirty) lets it assert that.
pub struct FieldData {
    kvs: SharedKvs,
    cache: BTreeMap<FieldKey, Value>,
    dirty: BTreeSet<FieldKey>,
}

impl FieldData {
    pub fn new(kvs: SharedKvs) -> Self {
        Self {
            kvs,
            cache: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// The explicitly-set value for a key, if any.
    pub fn get(&self, key: &FieldKey) -> Option<Value> {
        if let Some(value) = self.cache.get(key) {
            return Some(value.clone());
        }
        self.lock_kvs().get(key)
    }

    /// Stage a value. Dirty until saved.
    pub fn set(&mut self, key: FieldKey, value: Value) {
        self.cache.insert(key.clone(), value);
        self.dirty.insert(key);
    }

    /// Remove an override from both the cache and the backing store.
    pub fn delete(&mut self, key: &FieldKey) -> bool {
        self.cache.remove(key);
        self.dirty.remove(key);
        self.lock_kvs().delete(key)
    }

    /// Whether an override has been set, staged or persisted.
    pub fn has(&self, key: &FieldKey) -> bool {
        self.cache.contains_key(key) || self.lock_kvs().has(key)
    }

    /// Value inherited from the nearest ancestor, per the backing store.
    pub fn inherited(&self, usage: &UsageId, field: &str) -> Option<Value> {
        self.lock_kvs().inherited(usage, field)
    }

    /// Whether unsaved writes exist.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Flush staged writes to the backing store.
    pub fn save(&mut self) {
        let dirty = std::mem::take(&mut self.dirty);
        let mut kvs = self.lock_kvs();
        for key in dirty {
            if let Some(value) = self.cache.get(&key) {
                kvs.set(key, value.clone());
            }
        }
    }

    /// The shared backing store handle, for persistence layers.
    ///
    /// Callers own the save contract: flush with [`save`](FieldData::save)
    /// before reading block state out of the returned store.
    pub fn kvs(&self) -> SharedKvs {
        self.kvs.clone()
    }

    fn lock_kvs(&self) -> std::sync::MutexGuard<'_, dyn crate::kvs::KeyValueStore + Send + 'static> {
        self.kvs.lock().expect("field store lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvs::{KeyValueStore, MemoryKvs};
    use crate::scope::Scope;
    use courseware_keys::{CourseKey, UsageId};

    fn usage() -> UsageId {
        let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
        UsageId::new(course, "problem", "quiz_1").unwrap()
    }

    fn key(field: &str) -> FieldKey {
        FieldKey::new(Scope::Settings, usage(), field)
    }

    #[test]
    fn writes_stay_local_until_save() {
        let kvs = MemoryKvs::new().shared();
        let mut data = FieldData::new(kvs.clone());

        data.set(key("display_name"), Value::from("Quiz"));
        assert!(data.is_dirty());
        assert_eq!(data.get(&key("display_name")), Some(Value::from("Quiz")));

        // nothing persisted yet
        assert!(!kvs.lock().unwrap().has(&key("display_name")));

        data.save();
        assert!(!data.is_dirty());
        assert!(kvs.lock().unwrap().has(&key("display_name")));
        assert_eq!(
            kvs.lock().unwrap().get(&key("display_name")),
            Some(Value::from("Quiz"))
        );
    }

    #[test]
    fn reads_fall_through_to_store() {
        let mut backing = MemoryKvs::new();
        backing.set(key("weight"), Value::Integer(10));
        let data = FieldData::new(backing.shared());

        assert_eq!(data.get(&key("weight")), Some(Value::Integer(10)));
        assert!(data.has(&key("weight")));
        assert!(!data.is_dirty());
    }

    #[test]
    fn staged_value_shadows_store() {
        let mut backing = MemoryKvs::new();
        backing.set(key("weight"), Value::Integer(10));
        let mut data = FieldData::new(backing.shared());

        data.set(key("weight"), Value::Integer(20));
        assert_eq!(data.get(&key("weight")), Some(Value::Integer(20)));
    }

    #[test]
    fn delete_clears_everywhere() {
        let kvs = MemoryKvs::new().shared();
        let mut data = FieldData::new(kvs.clone());

        data.set(key("weight"), Value::Integer(10));
        data.save();
        assert!(data.delete(&key("weight")));
        assert!(!data.has(&key("weight")));
        assert!(!kvs.lock().unwrap().has(&key("weight")));
    }

    #[test]
    fn save_is_idempotent() {
        let kvs = MemoryKvs::new().shared();
        let mut data = FieldData::new(kvs.clone());

        data.set(key("weight"), Value::Integer(10));
        data.save();
        data.save();
        assert_eq!(kvs.lock().unwrap().len(), 1);
    }
}
