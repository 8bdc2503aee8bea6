//! The block type registry.
//!
//! An explicit startup-time table mapping type names to implementations.
//! Population happens through `register` calls while the registry is still
//! exclusively owned; afterwards it is shared immutably behind an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::aside::AsideBehavior;
use crate::behavior::BlockBehavior;
use crate::error::{Result, RuntimeError};

/// Maps block-type names and aside-type names to their implementations.
#[derive(Default)]
pub struct BlockTypeRegistry {
    blocks: BTreeMap<String, Arc<dyn BlockBehavior>>,
    asides: BTreeMap<String, Arc<dyn AsideBehavior>>,
}

impl BlockTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block implementation under its declared type name,
    /// replacing any previous registration.
    pub fn register(&mut self, behavior: Arc<dyn BlockBehavior>) {
        self.blocks
            .insert(behavior.block_type().to_string(), behavior);
    }

    /// Register an aside implementation under its declared aside type.
    pub fn register_aside(&mut self, behavior: Arc<dyn AsideBehavior>) {
        self.asides
            .insert(behavior.aside_type().to_string(), behavior);
    }

    /// Resolve a block type name to its implementation.
    pub fn load_block_type(&self, name: &str) -> Result<Arc<dyn BlockBehavior>> {
        self.blocks
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownBlockType(name.to_string()))
    }

    /// Resolve an aside type name to its implementation.
    pub fn load_aside_type(&self, name: &str) -> Result<Arc<dyn AsideBehavior>> {
        self.asides
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownBlockType(name.to_string()))
    }

    pub fn block_types(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn aside_types(&self) -> impl Iterator<Item = &str> {
        self.asides.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseware_fields::FieldSchema;

    struct NullBlock;

    impl BlockBehavior for NullBlock {
        fn block_type(&self) -> &str {
            "null"
        }

        fn fields(&self) -> FieldSchema {
            FieldSchema::new()
        }
    }

    #[test]
    fn register_and_load() {
        let mut registry = BlockTypeRegistry::new();
        registry.register(Arc::new(NullBlock));

        let loaded = registry.load_block_type("null").unwrap();
        assert_eq!(loaded.block_type(), "null");
        assert_eq!(registry.block_types().collect::<Vec<_>>(), vec!["null"]);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = BlockTypeRegistry::new();
        assert!(matches!(
            registry.load_block_type("poll"),
            Err(RuntimeError::UnknownBlockType(name)) if name == "poll"
        ));
    }
}
