//! The environment binders injected into block instances.
//!
//! Two concrete runtimes exist. The [`AuthoringRuntime`] supplies
//! descriptor-side services: block resolution, authoring policy, field
//! provenance, XML import/export support. The [`StudentRuntime`] layers
//! student-facing services on top - user context, per-student field
//! storage, the error-block substitution - and always keeps the authoring
//! services reachable. [`RuntimeHandle`] is the facade blocks hold: a sum
//! type dispatching by binding state.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use courseware_fields::{SharedKvs, Value};
use courseware_keys::{DefinitionId, IdGenerator, ScopeIds, UsageId};

use crate::block::BlockInstance;
use crate::error::{Result, RuntimeError};
use crate::mixology::Mixer;
use crate::pipeline::{FragmentWrapper, Telemetry, TracingTelemetry};
use crate::registry::BlockTypeRegistry;
use crate::store::ContentStore;

/// Environment-specific URL construction and aside discovery.
///
/// These are late-binding integration points: the host application
/// supplies real implementations at runtime construction, and the
/// [`UnimplementedHost`] default fails with
/// [`RuntimeError::NotImplemented`] until it does.
pub trait HostServices: Send + Sync {
    /// URL for invoking a handler on a block.
    fn handler_url(
        &self,
        _block: &BlockInstance,
        _handler: &str,
        _suffix: &str,
        _query: &str,
    ) -> Result<String> {
        Err(RuntimeError::NotImplemented("handler_url"))
    }

    /// URL for a static resource packaged with a block type.
    fn local_resource_url(&self, _block: &BlockInstance, _uri: &str) -> Result<String> {
        Err(RuntimeError::NotImplemented("local_resource_url"))
    }

    /// Aside types that apply to a block in this deployment.
    fn applicable_aside_types(&self, _block: &BlockInstance) -> Result<Vec<String>> {
        Err(RuntimeError::NotImplemented("applicable_aside_types"))
    }
}

/// The default host: every service is still unsupplied.
pub struct UnimplementedHost;

impl HostServices for UnimplementedHost {}

/// The user a student runtime acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: Option<String>,
    anonymous_id: String,
    is_staff: bool,
}

impl UserContext {
    pub fn anonymous(anonymous_id: impl Into<String>) -> Self {
        Self {
            user_id: None,
            anonymous_id: anonymous_id.into(),
            is_staff: false,
        }
    }

    pub fn authenticated(
        user_id: impl Into<String>,
        anonymous_id: impl Into<String>,
        is_staff: bool,
    ) -> Self {
        Self {
            user_id: Some(user_id.into()),
            anonymous_id: anonymous_id.into(),
            is_staff,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn anonymous_id(&self) -> &str {
        &self.anonymous_id
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    /// The key under which this user's state is stored.
    pub fn user_key(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.anonymous_id)
    }
}

/// Filters which blocks a student may see during tree traversal.
pub trait AccessPolicy: Send + Sync {
    fn can_view(&self, _block: &Arc<BlockInstance>, _user: &UserContext) -> bool {
        true
    }
}

/// The default policy: everything is visible.
pub struct AllowAll;

impl AccessPolicy for AllowAll {}

/// Hides blocks whose `visible_to_staff_only` setting is on from
/// non-staff users.
pub struct StaffVisibilityPolicy;

impl AccessPolicy for StaffVisibilityPolicy {
    fn can_view(&self, block: &Arc<BlockInstance>, user: &UserContext) -> bool {
        if user.is_staff() || !block.schema().contains("visible_to_staff_only") {
            return true;
        }
        !matches!(
            block.get_field("visible_to_staff_only"),
            Ok(Value::Bool(true))
        )
    }
}

/// A field's provenance, for the metadata editor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProvenance {
    /// The value in effect when no explicit override is set: the inherited
    /// ancestor setting if one exists, else the schema default.
    pub default_value: Value,
    /// Whether an explicit override is set. Setting one does not change
    /// `default_value`.
    pub explicitly_set: bool,
}

/// The authoring-side environment binder.
pub struct AuthoringRuntime {
    registry: Arc<BlockTypeRegistry>,
    mixer: Arc<Mixer>,
    store: Arc<dyn ContentStore>,
    id_generator: Arc<dyn IdGenerator>,
    kvs: SharedKvs,
    host: Arc<dyn HostServices>,
    telemetry: Arc<dyn Telemetry>,
    wrappers: Vec<Arc<dyn FragmentWrapper>>,
    me: Weak<AuthoringRuntime>,
}

impl AuthoringRuntime {
    /// Build a runtime with the default host, telemetry and no wrappers.
    /// Finish with [`into_handle`](Self::into_handle).
    pub fn new(
        registry: Arc<BlockTypeRegistry>,
        mixer: Arc<Mixer>,
        store: Arc<dyn ContentStore>,
        id_generator: Arc<dyn IdGenerator>,
        kvs: SharedKvs,
    ) -> Self {
        Self {
            registry,
            mixer,
            store,
            id_generator,
            kvs,
            host: Arc::new(UnimplementedHost),
            telemetry: Arc::new(TracingTelemetry),
            wrappers: Vec::new(),
            me: Weak::new(),
        }
    }

    pub fn with_host(mut self, host: Arc<dyn HostServices>) -> Self {
        self.host = host;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn add_wrapper(mut self, wrapper: Arc<dyn FragmentWrapper>) -> Self {
        self.wrappers.push(wrapper);
        self
    }

    /// Finalize into the shared handle blocks hold onto.
    pub fn into_handle(mut self) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            self.me = weak.clone();
            self
        })
    }

    fn handle(&self) -> Result<Arc<Self>> {
        self.me
            .upgrade()
            .ok_or(RuntimeError::UnboundRuntime("authoring runtime handle"))
    }

    pub fn registry(&self) -> &BlockTypeRegistry {
        &self.registry
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn id_generator(&self) -> &Arc<dyn IdGenerator> {
        &self.id_generator
    }

    pub fn kvs(&self) -> SharedKvs {
        self.kvs.clone()
    }

    pub fn host(&self) -> &Arc<dyn HostServices> {
        &self.host
    }

    pub fn telemetry(&self) -> Arc<dyn Telemetry> {
        self.telemetry.clone()
    }

    pub(crate) fn wrappers(&self) -> &[Arc<dyn FragmentWrapper>] {
        &self.wrappers
    }

    /// Resolve and hydrate a block by id, bound to this runtime.
    pub fn get_block(&self, usage: &UsageId) -> Result<Arc<BlockInstance>> {
        let handle = self.handle()?;
        let block = self.store.load_item(usage, &handle)?;
        block.attach_runtime(handle);
        Ok(block)
    }

    /// Construct an unhydrated instance of the identified type, with the
    /// deployment capabilities mixed in and this runtime attached.
    pub fn construct_block(&self, scope_ids: ScopeIds) -> Result<Arc<BlockInstance>> {
        let base = self.registry.load_block_type(scope_ids.block_type())?;
        let mixed = self.mixer.mix(base)?;
        let block = BlockInstance::new(mixed, scope_ids, self.kvs.clone());
        block.attach_runtime(self.handle()?);
        Ok(block)
    }

    /// Authoring policy overrides for a usage.
    pub fn get_policy(&self, usage: &UsageId) -> BTreeMap<String, Value> {
        self.store.get_policy(usage)
    }

    /// Report a non-fatal structural problem to the content store.
    pub fn error_tracker(&self, message: &str) {
        self.store.error_tracker(message);
    }

    /// A field's effective default and whether it is explicitly overridden.
    ///
    /// Resolution order for the default: nearest-ancestor inherited
    /// setting, then schema default. An explicit override flips
    /// `explicitly_set` without touching the default.
    pub fn get_field_provenance(
        &self,
        block: &BlockInstance,
        field: &str,
    ) -> Result<FieldProvenance> {
        let descriptor = block.schema().require(field)?.clone();
        let explicitly_set = block.has_explicit(field)?;
        let default_value = block
            .inherited_value(field)?
            .unwrap_or(descriptor.default);
        Ok(FieldProvenance {
            default_value,
            explicitly_set,
        })
    }

    /// Per-field editor payload for the settings scope.
    pub fn editable_metadata(
        &self,
        block: &BlockInstance,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut out = serde_json::Map::new();
        for descriptor in block.schema().iter() {
            if descriptor.scope != courseware_fields::Scope::Settings {
                continue;
            }
            let provenance = self.get_field_provenance(block, &descriptor.name)?;
            let mut info = serde_json::Map::new();
            info.insert(
                "field_name".to_string(),
                serde_json::Value::String(descriptor.name.clone()),
            );
            info.insert(
                "display_name".to_string(),
                serde_json::Value::String(
                    descriptor
                        .display_name
                        .clone()
                        .unwrap_or_else(|| descriptor.name.clone()),
                ),
            );
            info.insert(
                "help".to_string(),
                serde_json::Value::String(descriptor.help.clone().unwrap_or_default()),
            );
            info.insert("value".to_string(), block.get_field(&descriptor.name)?.to_json());
            info.insert(
                "default_value".to_string(),
                provenance.default_value.to_json(),
            );
            info.insert(
                "explicitly_set".to_string(),
                serde_json::Value::Bool(provenance.explicitly_set),
            );
            out.insert(descriptor.name.clone(), serde_json::Value::Object(info));
        }
        Ok(out)
    }
}

/// The student-side environment binder.
///
/// Wraps an [`AuthoringRuntime`]; descriptor services remain reachable.
pub struct StudentRuntime {
    authoring: Arc<AuthoringRuntime>,
    user: UserContext,
    student_kvs: SharedKvs,
    error_block_type: String,
    access: Arc<dyn AccessPolicy>,
    wrappers: Vec<Arc<dyn FragmentWrapper>>,
}

impl StudentRuntime {
    pub fn new(authoring: Arc<AuthoringRuntime>, user: UserContext, student_kvs: SharedKvs) -> Self {
        Self {
            authoring,
            user,
            student_kvs,
            error_block_type: "error".to_string(),
            access: Arc::new(AllowAll),
            wrappers: Vec::new(),
        }
    }

    pub fn with_error_block_type(mut self, block_type: impl Into<String>) -> Self {
        self.error_block_type = block_type.into();
        self
    }

    pub fn with_access_policy(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    pub fn add_wrapper(mut self, wrapper: Arc<dyn FragmentWrapper>) -> Self {
        self.wrappers.push(wrapper);
        self
    }

    pub fn authoring(&self) -> &Arc<AuthoringRuntime> {
        &self.authoring
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    pub fn student_kvs(&self) -> SharedKvs {
        self.student_kvs.clone()
    }

    pub fn access_policy(&self) -> &Arc<dyn AccessPolicy> {
        &self.access
    }

    /// The block type substituted when student construction fails.
    pub fn error_block_type(&self) -> &str {
        &self.error_block_type
    }

    pub(crate) fn wrappers(&self) -> &[Arc<dyn FragmentWrapper>] {
        &self.wrappers
    }

    /// Build and bind the error-block stand-in for a block whose student
    /// construction failed.
    ///
    /// Failures in here are not caught again: the fallback has already
    /// failed, so they propagate.
    pub(crate) fn error_substitute(
        runtime: &Arc<StudentRuntime>,
        original: &BlockInstance,
        message: &str,
    ) -> Result<Arc<BlockInstance>> {
        let authoring = &runtime.authoring;
        let base = authoring
            .registry()
            .load_block_type(&runtime.error_block_type)?;
        let mixed = authoring.mixer().mix(base)?;

        let original_ids = original.scope_ids();
        let def_id = DefinitionId::new(
            runtime.error_block_type.as_str(),
            original_ids.usage_id().name(),
        )?;
        let scope_ids = ScopeIds::new(
            runtime.error_block_type.as_str(),
            def_id,
            original_ids.usage_id().clone(),
        );

        let block = BlockInstance::new(mixed, scope_ids, authoring.kvs());
        block.set_field("error_message", Value::from(message))?;
        block.attach_runtime(authoring.handle()?);
        block.bind_for_student(runtime)?;
        Ok(block)
    }
}

/// The runtime facade a block exposes: one interface, dispatching by
/// binding state.
#[derive(Clone)]
pub enum RuntimeHandle {
    Authoring(Arc<AuthoringRuntime>),
    Student(Arc<StudentRuntime>),
}

impl RuntimeHandle {
    pub fn for_authoring(runtime: Arc<AuthoringRuntime>) -> Self {
        RuntimeHandle::Authoring(runtime)
    }

    pub fn for_student(runtime: Arc<StudentRuntime>) -> Self {
        RuntimeHandle::Student(runtime)
    }

    /// The authoring services, reachable in either state.
    pub fn authoring(&self) -> &Arc<AuthoringRuntime> {
        match self {
            RuntimeHandle::Authoring(runtime) => runtime,
            RuntimeHandle::Student(runtime) => runtime.authoring(),
        }
    }

    pub fn get_block(&self, usage: &UsageId) -> Result<Arc<BlockInstance>> {
        self.authoring().get_block(usage)
    }

    pub fn handler_url(
        &self,
        block: &BlockInstance,
        handler: &str,
        suffix: &str,
        query: &str,
    ) -> Result<String> {
        self.authoring().host().handler_url(block, handler, suffix, query)
    }

    pub fn local_resource_url(&self, block: &BlockInstance, uri: &str) -> Result<String> {
        self.authoring().host().local_resource_url(block, uri)
    }

    pub fn applicable_aside_types(&self, block: &BlockInstance) -> Result<Vec<String>> {
        self.authoring().host().applicable_aside_types(block)
    }

    pub fn get_field_provenance(
        &self,
        block: &BlockInstance,
        field: &str,
    ) -> Result<FieldProvenance> {
        self.authoring().get_field_provenance(block, field)
    }

    pub fn get_policy(&self, usage: &UsageId) -> BTreeMap<String, Value> {
        self.authoring().get_policy(usage)
    }

    pub fn error_tracker(&self, message: &str) {
        self.authoring().error_tracker(message);
    }

    pub fn telemetry(&self) -> Arc<dyn Telemetry> {
        self.authoring().telemetry()
    }

    pub(crate) fn wrappers(&self) -> &[Arc<dyn FragmentWrapper>] {
        match self {
            RuntimeHandle::Authoring(runtime) => runtime.wrappers(),
            RuntimeHandle::Student(runtime) => runtime.wrappers(),
        }
    }
}
