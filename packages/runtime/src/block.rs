//! The in-memory block instance: fields, tree structure, runtime binding.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use courseware_fields::{FieldData, FieldDescriptor, FieldKey, FieldSchema, Scope, SharedKvs, Value};
use courseware_keys::{ScopeIds, UsageId};

use crate::aside::AsideInstance;
use crate::behavior::BlockBehavior;
use crate::error::{Result, RuntimeError};
use crate::fragment::escape_html;
use crate::runtime::{AuthoringRuntime, RuntimeHandle, StudentRuntime};

/// One block, hydrated for one request or edit session.
///
/// An instance starts unbound. Attaching an [`AuthoringRuntime`] makes
/// descriptor-side services available; the first student-facing render
/// additionally binds it to a [`StudentRuntime`], exactly once for the
/// instance's lifetime. Child blocks are loaded lazily and memoized on the
/// instance - invalidation means discarding the whole instance.
pub struct BlockInstance {
    behavior: Arc<dyn BlockBehavior>,
    schema: FieldSchema,
    scope_ids: Mutex<ScopeIds>,
    parent: Mutex<Option<UsageId>>,
    child_ids: Mutex<Vec<UsageId>>,
    asides: Mutex<Vec<AsideInstance>>,
    fields: Mutex<FieldData>,
    student_fields: OnceLock<Mutex<FieldData>>,
    authoring: Mutex<Option<Arc<AuthoringRuntime>>>,
    student: OnceLock<StudentSlot>,
    loaded_children: OnceLock<Vec<Arc<BlockInstance>>>,
}

/// Outcome of the one-shot student binding.
pub(crate) enum StudentSlot {
    /// Binding succeeded; student services are reachable.
    Bound(Arc<StudentRuntime>),
    /// Binding failed and the designated error block stands in for
    /// student-facing rendering.
    Broken {
        runtime: Arc<StudentRuntime>,
        substitute: Arc<BlockInstance>,
    },
    /// Binding failed and so did the substitution. Every later access
    /// reports the failure instead of retrying.
    Fatal(String),
}

impl BlockInstance {
    /// Create an instance over the given backing field store.
    ///
    /// The behavior is expected to already be capability-composed; its
    /// schema is captured once here.
    pub fn new(
        behavior: Arc<dyn BlockBehavior>,
        scope_ids: ScopeIds,
        kvs: SharedKvs,
    ) -> Arc<Self> {
        let schema = behavior.fields();
        Arc::new(Self {
            behavior,
            schema,
            scope_ids: Mutex::new(scope_ids),
            parent: Mutex::new(None),
            child_ids: Mutex::new(Vec::new()),
            asides: Mutex::new(Vec::new()),
            fields: Mutex::new(FieldData::new(kvs)),
            student_fields: OnceLock::new(),
            authoring: Mutex::new(None),
            student: OnceLock::new(),
            loaded_children: OnceLock::new(),
        })
    }

    pub fn behavior(&self) -> &Arc<dyn BlockBehavior> {
        &self.behavior
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn scope_ids(&self) -> ScopeIds {
        self.lock(&self.scope_ids).clone()
    }

    pub fn usage_id(&self) -> UsageId {
        self.lock(&self.scope_ids).usage_id().clone()
    }

    pub fn block_type(&self) -> String {
        self.lock(&self.scope_ids).block_type().to_string()
    }

    /// Rewrite the identity triple for a relocation. The whole triple is
    /// replaced in one step.
    pub fn relocate(&self, usage_id: UsageId) {
        let mut ids = self.lock(&self.scope_ids);
        *ids = ids.relocated(usage_id);
    }

    // === Tree structure ===

    pub fn parent(&self) -> Option<UsageId> {
        self.lock(&self.parent).clone()
    }

    pub fn set_parent(&self, parent: UsageId) {
        *self.lock(&self.parent) = Some(parent);
    }

    /// The authoritative child list, as usage ids.
    pub fn children(&self) -> Vec<UsageId> {
        self.lock(&self.child_ids).clone()
    }

    pub fn set_children(&self, children: Vec<UsageId>) {
        *self.lock(&self.child_ids) = children;
    }

    /// Load (and memoize) the child instances.
    ///
    /// A child the store cannot find is skipped: the tree degrades
    /// gracefully with one diagnostic per missing child rather than failing
    /// the whole traversal. When bound to a student, children the access
    /// policy hides are omitted.
    pub fn get_children(&self) -> Result<Vec<Arc<BlockInstance>>> {
        if !self.behavior.has_children() {
            return Ok(Vec::new());
        }
        if let Some(children) = self.loaded_children.get() {
            return Ok(children.clone());
        }

        let handle = self.runtime()?;
        let mut loaded = Vec::new();
        for child_id in self.children() {
            match handle.get_block(&child_id) {
                Ok(child) => {
                    if let RuntimeHandle::Student(runtime) = &handle {
                        if !runtime.access_policy().can_view(&child, runtime.user()) {
                            continue;
                        }
                    }
                    loaded.push(child);
                }
                Err(RuntimeError::ItemNotFound(missing)) => {
                    tracing::warn!(
                        child = %missing,
                        parent = %self.usage_id(),
                        "unable to load child block, skipping"
                    );
                    handle.error_tracker(&format!("unable to load {}, skipping", missing));
                    handle.telemetry().item_not_found(&self.usage_id(), &missing);
                }
                Err(error) => return Err(error),
            }
        }

        Ok(self.loaded_children.get_or_init(|| loaded).clone())
    }

    /// Pre-populate the child cache with already-hydrated instances.
    pub(crate) fn prime_children(&self, children: Vec<Arc<BlockInstance>>) {
        let _ = self.loaded_children.set(children);
    }

    /// Whether any descendant exists at exactly `depth` levels below this
    /// block (`0` = immediate children present).
    pub fn has_children_at_depth(&self, depth: i64) -> Result<bool> {
        if depth < 0 {
            return Err(RuntimeError::InvalidArgument(format!(
                "negative depth: {}",
                depth
            )));
        }
        let children = self.get_children()?;
        if depth == 0 {
            return Ok(!children.is_empty());
        }
        for child in children {
            if child.has_children_at_depth(depth - 1)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Display titles of all leaf descendants, left to right. A block with
    /// no child-bearing behavior reports its own title.
    pub fn get_content_titles(&self) -> Result<Vec<String>> {
        if self.behavior.has_children() {
            let mut titles = Vec::new();
            for child in self.get_children()? {
                titles.extend(child.get_content_titles()?);
            }
            Ok(titles)
        } else {
            Ok(vec![self.display_name_with_default()])
        }
    }

    // === Fields ===

    /// The effective value of a field: explicit override, else inherited
    /// ancestor setting, else schema default.
    pub fn get_field(&self, name: &str) -> Result<Value> {
        let descriptor = self.schema.require(name)?.clone();
        let key = self.field_key(&descriptor);
        if let Some(value) = self.with_fields(&descriptor, |fields| fields.get(&key)) {
            return Ok(value);
        }
        if let Some(value) = self.lock(&self.fields).inherited(&key.usage, name) {
            return Ok(value);
        }
        Ok(descriptor.default)
    }

    /// Stage an explicit override. Dirty until [`save`](Self::save).
    pub fn set_field(&self, name: &str, value: Value) -> Result<()> {
        let descriptor = self.schema.require(name)?.clone();
        let key = self.field_key(&descriptor);
        self.with_fields(&descriptor, |fields| fields.set(key, value));
        Ok(())
    }

    /// Drop an explicit override, falling back to inherited/default.
    pub fn delete_field(&self, name: &str) -> Result<bool> {
        let descriptor = self.schema.require(name)?.clone();
        let key = self.field_key(&descriptor);
        Ok(self.with_fields(&descriptor, |fields| fields.delete(&key)))
    }

    /// Whether the field has an explicit override, staged or persisted.
    pub fn has_explicit(&self, name: &str) -> Result<bool> {
        let descriptor = self.schema.require(name)?.clone();
        let key = self.field_key(&descriptor);
        Ok(self.with_fields(&descriptor, |fields| fields.has(&key)))
    }

    /// The value this field inherits from its nearest ancestor, if the
    /// backing store tracks inheritance.
    pub fn inherited_value(&self, name: &str) -> Result<Option<Value>> {
        self.schema.require(name)?;
        Ok(self
            .lock(&self.fields)
            .inherited(&self.usage_id(), name))
    }

    /// Explicitly-set fields in one scope, as stored values.
    pub fn get_explicitly_set_fields_by_scope(
        &self,
        scope: Scope,
    ) -> Result<BTreeMap<String, Value>> {
        let mut result = BTreeMap::new();
        for descriptor in self.schema.iter() {
            if descriptor.scope != scope {
                continue;
            }
            let key = self.field_key(descriptor);
            let value = self.with_fields(descriptor, |fields| {
                if fields.has(&key) {
                    fields.get(&key)
                } else {
                    None
                }
            });
            if let Some(value) = value {
                result.insert(descriptor.name.clone(), value);
            }
        }
        Ok(result)
    }

    /// Whether staged writes exist that have not been flushed.
    pub fn is_dirty(&self) -> bool {
        if self.lock(&self.fields).is_dirty() {
            return true;
        }
        match self.student_fields.get() {
            Some(fields) => fields
                .lock()
                .expect("block instance lock poisoned")
                .is_dirty(),
            None => false,
        }
    }

    /// Flush staged field writes to the backing stores. This is the
    /// explicit save-point: call it before handing a store to persistence
    /// code.
    pub fn save(&self) {
        self.lock(&self.fields).save();
        if let Some(fields) = self.student_fields.get() {
            fields
                .lock()
                .expect("block instance lock poisoned")
                .save();
        }
    }

    /// The display title: the `display_name` field if set, else the usage
    /// name with underscores as spaces. Markup-significant characters are
    /// escaped.
    pub fn display_name_with_default(&self) -> String {
        let name = if self.schema.contains("display_name") {
            match self.get_field("display_name") {
                Ok(Value::String(name)) => Some(name),
                _ => None,
            }
        } else {
            None
        };
        let name = name.unwrap_or_else(|| self.usage_id().name().replace('_', " "));
        escape_html(&name)
    }

    // === Asides ===

    pub fn add_aside(&self, aside: AsideInstance) {
        self.lock(&self.asides).push(aside);
    }

    pub fn asides(&self) -> Vec<AsideInstance> {
        self.lock(&self.asides).clone()
    }

    // === Runtime binding ===

    /// Attach (or replace, wholesale) the authoring runtime.
    pub fn attach_runtime(&self, runtime: Arc<AuthoringRuntime>) {
        *self.lock(&self.authoring) = Some(runtime);
    }

    /// The currently bound runtime facade.
    ///
    /// Student services win once student binding happened; descriptor
    /// services stay reachable through them. Unbound access is an error,
    /// never a null result.
    pub fn runtime(&self) -> Result<RuntimeHandle> {
        if let Some(slot) = self.student.get() {
            match slot {
                StudentSlot::Bound(runtime) | StudentSlot::Broken { runtime, .. } => {
                    return Ok(RuntimeHandle::Student(runtime.clone()));
                }
                StudentSlot::Fatal(_) => {}
            }
        }
        if let Some(runtime) = self.lock(&self.authoring).clone() {
            return Ok(RuntimeHandle::Authoring(runtime));
        }
        Err(RuntimeError::UnboundRuntime("runtime"))
    }

    /// Whether student binding has completed (successfully or with the
    /// error-block substitution).
    pub fn is_student_bound(&self) -> bool {
        matches!(
            self.student.get(),
            Some(StudentSlot::Bound(_) | StudentSlot::Broken { .. })
        )
    }

    /// Bind this instance for student-facing use. At most one binding is
    /// ever constructed; concurrent callers observe the first result.
    pub fn bind_for_student(&self, runtime: &Arc<StudentRuntime>) -> Result<()> {
        let slot = self
            .student
            .get_or_init(|| self.construct_student(runtime));
        match slot {
            StudentSlot::Fatal(message) => {
                Err(RuntimeError::StudentBindFailed(message.clone()))
            }
            _ => Ok(()),
        }
    }

    fn construct_student(&self, runtime: &Arc<StudentRuntime>) -> StudentSlot {
        match self.behavior.student_bind(self, runtime) {
            Ok(()) => {
                let _ = self
                    .student_fields
                    .set(Mutex::new(FieldData::new(runtime.student_kvs())));
                StudentSlot::Bound(runtime.clone())
            }
            Err(error) => {
                if self.block_type() == runtime.error_block_type() {
                    tracing::error!(
                        usage = %self.usage_id(),
                        %error,
                        "error block failed its own student binding"
                    );
                    return StudentSlot::Fatal(error.to_string());
                }
                tracing::error!(
                    usage = %self.usage_id(),
                    %error,
                    "student binding failed, substituting error block"
                );
                match StudentRuntime::error_substitute(runtime, self, &error.to_string()) {
                    Ok(substitute) => StudentSlot::Broken {
                        runtime: runtime.clone(),
                        substitute,
                    },
                    Err(second) => StudentSlot::Fatal(second.to_string()),
                }
            }
        }
    }

    pub(crate) fn student_slot(&self) -> Option<&StudentSlot> {
        self.student.get()
    }

    /// Run `f` against the field data the descriptor's scope routes to:
    /// user-state fields go to the per-student store once student binding
    /// happened, everything else to the content-side store.
    fn with_fields<R>(
        &self,
        descriptor: &FieldDescriptor,
        f: impl FnOnce(&mut FieldData) -> R,
    ) -> R {
        if descriptor.scope.is_user_state() {
            if let Some(fields) = self.student_fields.get() {
                return f(&mut fields.lock().expect("block instance lock poisoned"));
            }
        }
        f(&mut self.lock(&self.fields))
    }

    fn field_key(&self, descriptor: &FieldDescriptor) -> FieldKey {
        let usage = self.usage_id();
        if descriptor.scope.is_user_state() {
            if let Some(user) = self.student_user() {
                return FieldKey::for_user(descriptor.scope, usage, &descriptor.name, user);
            }
        }
        FieldKey::new(descriptor.scope, usage, &descriptor.name)
    }

    fn student_user(&self) -> Option<String> {
        match self.student.get() {
            Some(StudentSlot::Bound(runtime) | StudentSlot::Broken { runtime, .. }) => {
                Some(runtime.user().user_key().to_string())
            }
            _ => None,
        }
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().expect("block instance lock poisoned")
    }
}
