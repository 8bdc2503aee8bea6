//! The content store collaborator.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use courseware_fields::Value;
use courseware_keys::UsageId;

use crate::block::BlockInstance;
use crate::error::{Result, RuntimeError};
use crate::runtime::AuthoringRuntime;

/// What the runtime consumes from the persistent content store.
///
/// The store's query and versioning semantics are its own business; this
/// core only needs item resolution, authoring policy lookup and a sink for
/// non-fatal structural problems found while loading.
pub trait ContentStore: Send + Sync {
    /// Resolve a usage to a hydrated block.
    ///
    /// `runtime` is the authoring runtime requesting the load; stores use
    /// it to construct instances with the right composed types.
    fn load_item(
        &self,
        usage: &UsageId,
        runtime: &Arc<AuthoringRuntime>,
    ) -> Result<Arc<BlockInstance>>;

    /// Authoring policy overrides for a usage.
    fn get_policy(&self, _usage: &UsageId) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// Record a non-fatal structural problem (missing child, malformed
    /// reference) found during loading.
    fn error_tracker(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// In-memory store of already-hydrated instances.
///
/// Useful for imports and tests; collected diagnostics are inspectable.
#[derive(Default)]
pub struct MemoryContentStore {
    items: Mutex<BTreeMap<UsageId, Arc<BlockInstance>>>,
    policies: Mutex<BTreeMap<UsageId, BTreeMap<String, Value>>>,
    errors: Mutex<Vec<String>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, block: Arc<BlockInstance>) {
        self.items
            .lock()
            .expect("content store lock poisoned")
            .insert(block.usage_id(), block);
    }

    pub fn remove(&self, usage: &UsageId) -> Option<Arc<BlockInstance>> {
        self.items
            .lock()
            .expect("content store lock poisoned")
            .remove(usage)
    }

    pub fn set_policy(&self, usage: UsageId, policy: BTreeMap<String, Value>) {
        self.policies
            .lock()
            .expect("content store lock poisoned")
            .insert(usage, policy);
    }

    /// Diagnostics recorded through the error tracker.
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .expect("content store lock poisoned")
            .clone()
    }
}

impl ContentStore for MemoryContentStore {
    fn load_item(
        &self,
        usage: &UsageId,
        _runtime: &Arc<AuthoringRuntime>,
    ) -> Result<Arc<BlockInstance>> {
        self.items
            .lock()
            .expect("content store lock poisoned")
            .get(usage)
            .cloned()
            .ok_or_else(|| RuntimeError::ItemNotFound(usage.clone()))
    }

    fn get_policy(&self, usage: &UsageId) -> BTreeMap<String, Value> {
        self.policies
            .lock()
            .expect("content store lock poisoned")
            .get(usage)
            .cloned()
            .unwrap_or_default()
    }

    fn error_tracker(&self, message: &str) {
        self.errors
            .lock()
            .expect("content store lock poisoned")
            .push(message.to_string());
    }
}
