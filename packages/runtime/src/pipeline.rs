//! The rendering pipeline: view dispatch, wrapping, observability.

use std::fmt;
use std::sync::Arc;

use courseware_keys::UsageId;

use crate::behavior::{ViewContext, AUTHOR_VIEW, PREVIEW_VIEWS, STUDENT_VIEW, STUDIO_VIEW};
use crate::block::{BlockInstance, StudentSlot};
use crate::error::{Result, RuntimeError};
use crate::fragment::Fragment;
use crate::runtime::RuntimeHandle;

/// Outcome tag attached to every render event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

/// One render attempt, for observability sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEvent {
    pub view: String,
    pub block_type: String,
    pub outcome: Outcome,
}

/// Observability sink injected into the runtimes.
pub trait Telemetry: Send + Sync {
    /// Called once per render attempt, success or failure.
    fn render_event(&self, event: &RenderEvent);

    /// Called when tree traversal skips a missing child.
    fn item_not_found(&self, _parent: &UsageId, _child: &UsageId) {}
}

/// Default sink: structured log lines via `tracing`.
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn render_event(&self, event: &RenderEvent) {
        tracing::debug!(
            view = %event.view,
            block_type = %event.block_type,
            outcome = %event.outcome,
            "render"
        );
    }

    fn item_not_found(&self, parent: &UsageId, child: &UsageId) {
        tracing::debug!(%parent, %child, "item not found");
    }
}

/// One fragment decoration step in the wrapper chain.
///
/// Wrappers compose left to right, each seeing the previous wrapper's
/// output. A wrapper may add markup around the fragment but is expected to
/// keep what earlier wrappers produced.
pub trait FragmentWrapper: Send + Sync {
    fn wrap(
        &self,
        block: &Arc<BlockInstance>,
        view: &str,
        fragment: Fragment,
        context: &ViewContext,
    ) -> Fragment;
}

impl<F> FragmentWrapper for F
where
    F: Fn(&Arc<BlockInstance>, &str, Fragment, &ViewContext) -> Fragment + Send + Sync,
{
    fn wrap(
        &self,
        block: &Arc<BlockInstance>,
        view: &str,
        fragment: Fragment,
        context: &ViewContext,
    ) -> Fragment {
        self(block, view, fragment, context)
    }
}

/// Emits the render event when dropped, so failures are recorded too.
struct RenderGuard {
    telemetry: Arc<dyn Telemetry>,
    view: String,
    block_type: String,
    success: bool,
}

impl RenderGuard {
    fn new(telemetry: Arc<dyn Telemetry>, view: &str, block_type: String) -> Self {
        Self {
            telemetry,
            view: view.to_string(),
            block_type,
            success: false,
        }
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        self.telemetry.render_event(&RenderEvent {
            view: self.view.clone(),
            block_type: self.block_type.clone(),
            outcome: if self.success {
                Outcome::Success
            } else {
                Outcome::Failure
            },
        });
    }
}

impl RuntimeHandle {
    /// Render a named view of a block into a fragment.
    ///
    /// Student-facing views transition a descriptor-bound block through the
    /// error-fallback-protected student construction first. The dispatched
    /// result then runs through the wrapper chain and aside decoration.
    pub fn render(
        &self,
        block: &Arc<BlockInstance>,
        view: &str,
        context: &ViewContext,
    ) -> Result<Fragment> {
        let mut guard = RenderGuard::new(self.telemetry(), view, block.block_type());
        let result = self.render_unmetered(block, view, context);
        if result.is_ok() {
            guard.success = true;
        }
        result
    }

    fn render_unmetered(
        &self,
        block: &Arc<BlockInstance>,
        view: &str,
        context: &ViewContext,
    ) -> Result<Fragment> {
        let fragment = if PREVIEW_VIEWS.contains(&view) {
            let runtime = match self {
                RuntimeHandle::Student(runtime) => runtime,
                RuntimeHandle::Authoring(_) => {
                    return Err(RuntimeError::UnboundRuntime("student view rendering"));
                }
            };
            block.bind_for_student(runtime)?;
            block.behavior().authorize_view(block, view)?;
            let target = match block.student_slot() {
                Some(StudentSlot::Broken { substitute, .. }) => substitute.clone(),
                _ => block.clone(),
            };
            match view {
                STUDENT_VIEW => target.behavior().student_view(&target, context)?,
                AUTHOR_VIEW => target.behavior().author_view(&target, context)?,
                _ => unreachable!("PREVIEW_VIEWS covers exactly these"),
            }
        } else if view == STUDIO_VIEW {
            block.behavior().authorize_view(block, view)?;
            block.behavior().studio_view(block, context)?
        } else {
            return Err(RuntimeError::view_not_supported(view, &block.block_type()));
        };

        let fragment = self.wrap(block, view, fragment, context);
        self.decorate_asides(block, fragment)
    }

    /// Thread a fragment through the configured wrapper chain.
    pub fn wrap(
        &self,
        block: &Arc<BlockInstance>,
        view: &str,
        fragment: Fragment,
        context: &ViewContext,
    ) -> Fragment {
        self.wrappers()
            .iter()
            .fold(fragment, |fragment, wrapper| {
                wrapper.wrap(block, view, fragment, context)
            })
    }

    /// Apply registered aside decorations for the aside types the host
    /// declares applicable. A host that has not supplied the discovery
    /// seam yet means no decoration, not a failed render.
    fn decorate_asides(
        &self,
        block: &Arc<BlockInstance>,
        mut fragment: Fragment,
    ) -> Result<Fragment> {
        let applicable = match self.applicable_aside_types(block) {
            Ok(types) => types,
            Err(RuntimeError::NotImplemented(_)) => Vec::new(),
            Err(error) => return Err(error),
        };
        if applicable.is_empty() {
            return Ok(fragment);
        }

        let authoring = self.authoring().clone();
        for aside in block.asides() {
            if !applicable.iter().any(|name| name == aside.aside_type()) {
                continue;
            }
            if let Ok(behavior) = authoring.registry().load_aside_type(aside.aside_type()) {
                fragment = behavior.aside_view(&aside, block, fragment);
            }
        }
        Ok(fragment)
    }
}
