//! Capability composition.
//!
//! A deployment configures an ordered list of capabilities (mixins) that
//! every block type is composed with at load time: a display-name field,
//! staff-only gating, and whatever else the installation registers. The
//! [`Mixer`] performs that composition once per base type and caches the
//! result, so mixing is deterministic and idempotent.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use courseware_fields::{FieldDescriptor, FieldSchema, Scope, Value};

use crate::behavior::{BlockBehavior, ViewContext, PREVIEW_VIEWS};
use crate::block::BlockInstance;
use crate::error::{Result, RuntimeError};
use crate::fragment::Fragment;
use crate::runtime::{RuntimeHandle, StudentRuntime};

/// A deployment capability mixed into every block type.
pub trait Capability: Send + Sync {
    /// The name the deployment configuration refers to this capability by.
    fn name(&self) -> &str;

    /// Extra fields this capability contributes to the schema.
    fn fields(&self) -> FieldSchema {
        FieldSchema::new()
    }

    /// Access hook run before a view is dispatched.
    fn authorize_view(&self, _block: &BlockInstance, _view: &str) -> Result<()> {
        Ok(())
    }
}

/// Deployment configuration: which capabilities to mix, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerConfig {
    pub mixins: Vec<String>,
}

/// Composes base block types with the configured capability list.
pub struct Mixer {
    capabilities: BTreeMap<String, Arc<dyn Capability>>,
    order: Vec<String>,
    cache: Mutex<BTreeMap<String, Arc<dyn BlockBehavior>>>,
}

impl Mixer {
    /// A mixer for the given configuration, with the built-in capabilities
    /// ([`DisplayNameCapability`], [`StaffLockCapability`]) pre-registered.
    pub fn new(config: MixerConfig) -> Self {
        let mut mixer = Self {
            capabilities: BTreeMap::new(),
            order: config.mixins,
            cache: Mutex::new(BTreeMap::new()),
        };
        mixer.register(Arc::new(DisplayNameCapability));
        mixer.register(Arc::new(StaffLockCapability));
        mixer
    }

    /// Register a capability implementation. Registration must happen
    /// before the mixer is shared.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities
            .insert(capability.name().to_string(), capability);
    }

    /// The configured capability order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Compose a base type with the configured capabilities.
    ///
    /// The result is cached per `(base type, capability list)`: mixing the
    /// same base twice returns the same composed type. A configured
    /// capability with no registration fails with
    /// [`RuntimeError::CapabilityNotSupported`].
    pub fn mix(&self, base: Arc<dyn BlockBehavior>) -> Result<Arc<dyn BlockBehavior>> {
        let cache_key = format!("{}|{}", base.block_type(), self.order.join(","));
        if let Some(mixed) = self.lock_cache().get(&cache_key) {
            return Ok(mixed.clone());
        }

        let mut capabilities = Vec::with_capacity(self.order.len());
        let mut schema = base.fields();
        for name in &self.order {
            let capability = self
                .capabilities
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::CapabilityNotSupported(name.clone()))?;
            schema = schema.merged(&capability.fields());
            capabilities.push(capability);
        }

        let mixed: Arc<dyn BlockBehavior> = Arc::new(MixedBehavior {
            base,
            capabilities,
            schema,
        });
        self.lock_cache().insert(cache_key, mixed.clone());
        Ok(mixed)
    }

    fn lock_cache(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<dyn BlockBehavior>>> {
        self.cache.lock().expect("mixer cache lock poisoned")
    }
}

/// A base type composed with a capability list.
///
/// Delegates every behavior question to the base; the composed schema and
/// the chained access hooks are the only differences.
struct MixedBehavior {
    base: Arc<dyn BlockBehavior>,
    capabilities: Vec<Arc<dyn Capability>>,
    schema: FieldSchema,
}

impl BlockBehavior for MixedBehavior {
    fn block_type(&self) -> &str {
        self.base.block_type()
    }

    fn fields(&self) -> FieldSchema {
        self.schema.clone()
    }

    fn has_children(&self) -> bool {
        self.base.has_children()
    }

    fn student_view(&self, block: &BlockInstance, context: &ViewContext) -> Result<Fragment> {
        self.base.student_view(block, context)
    }

    fn author_view(&self, block: &BlockInstance, context: &ViewContext) -> Result<Fragment> {
        self.base.author_view(block, context)
    }

    fn studio_view(&self, block: &BlockInstance, context: &ViewContext) -> Result<Fragment> {
        self.base.studio_view(block, context)
    }

    fn student_bind(&self, block: &BlockInstance, runtime: &StudentRuntime) -> Result<()> {
        self.base.student_bind(block, runtime)
    }

    fn authorize_view(&self, block: &BlockInstance, view: &str) -> Result<()> {
        for capability in &self.capabilities {
            capability.authorize_view(block, view)?;
        }
        self.base.authorize_view(block, view)
    }
}

/// Adds the `display_name` settings field used across the platform.
pub struct DisplayNameCapability;

impl Capability for DisplayNameCapability {
    fn name(&self) -> &str {
        "display_name"
    }

    fn fields(&self) -> FieldSchema {
        FieldSchema::new().with_field(
            FieldDescriptor::new("display_name", Scope::Settings)
                .with_display_name("Display Name")
                .with_help("This name appears in the course navigation."),
        )
    }
}

/// Adds a `visible_to_staff_only` settings flag and enforces it on
/// student-facing views.
pub struct StaffLockCapability;

impl Capability for StaffLockCapability {
    fn name(&self) -> &str {
        "staff_lock"
    }

    fn fields(&self) -> FieldSchema {
        FieldSchema::new().with_field(
            FieldDescriptor::new("visible_to_staff_only", Scope::Settings)
                .with_default(Value::Bool(false))
                .with_display_name("Visible to Staff Only"),
        )
    }

    fn authorize_view(&self, block: &BlockInstance, view: &str) -> Result<()> {
        if !PREVIEW_VIEWS.contains(&view) {
            return Ok(());
        }
        let locked = block
            .get_field("visible_to_staff_only")?
            .as_bool()
            .unwrap_or(false);
        if !locked {
            return Ok(());
        }
        match block.runtime() {
            Ok(RuntimeHandle::Student(runtime)) if !runtime.user().is_staff() => Err(
                RuntimeError::AccessDenied(block.scope_ids().usage_id().clone()),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;

    impl BlockBehavior for Leaf {
        fn block_type(&self) -> &str {
            "leaf"
        }

        fn fields(&self) -> FieldSchema {
            FieldSchema::new()
                .with_field(FieldDescriptor::new("data", Scope::Content))
        }
    }

    fn config(mixins: &[&str]) -> MixerConfig {
        MixerConfig {
            mixins: mixins.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn mix_merges_capability_fields() {
        let mixer = Mixer::new(config(&["display_name", "staff_lock"]));
        let mixed = mixer.mix(Arc::new(Leaf)).unwrap();

        let schema = mixed.fields();
        assert!(schema.contains("data"));
        assert!(schema.contains("display_name"));
        assert!(schema.contains("visible_to_staff_only"));
        assert_eq!(mixed.block_type(), "leaf");
    }

    #[test]
    fn mix_is_idempotent() {
        let mixer = Mixer::new(config(&["display_name"]));
        let first = mixer.mix(Arc::new(Leaf)).unwrap();
        let second = mixer.mix(Arc::new(Leaf)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.fields(), second.fields());
    }

    #[test]
    fn unknown_capability_is_an_error() {
        let mixer = Mixer::new(config(&["display_name", "telepathy"]));
        assert!(matches!(
            mixer.mix(Arc::new(Leaf)),
            Err(RuntimeError::CapabilityNotSupported(name)) if name == "telepathy"
        ));
    }

    #[test]
    fn config_deserializes() {
        let config: MixerConfig =
            serde_json::from_str(r#"{"mixins": ["display_name", "staff_lock"]}"#).unwrap();
        assert_eq!(config.mixins, vec!["display_name", "staff_lock"]);
    }

    #[test]
    fn empty_mix_keeps_base_schema() {
        let mixer = Mixer::new(MixerConfig::default());
        let mixed = mixer.mix(Arc::new(Leaf)).unwrap();
        assert_eq!(mixed.fields().len(), 1);
    }
}
