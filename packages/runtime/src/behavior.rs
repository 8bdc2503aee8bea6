//! The pluggable block implementation trait and view names.

use std::collections::BTreeMap;

use courseware_fields::{FieldSchema, Value};

use crate::block::BlockInstance;
use crate::error::{Result, RuntimeError};
use crate::fragment::Fragment;
use crate::runtime::StudentRuntime;

/// The view rendered to show a block to a student in the delivery
/// environment, and the preview fallback in the authoring environment.
pub const STUDENT_VIEW: &str = "student_view";

/// An optional authoring preview close to `student_view` but with inline
/// editing affordances. Preferred over `student_view` when previewing.
pub const AUTHOR_VIEW: &str = "author_view";

/// The authoring editor view, shown when an author edits the block.
pub const STUDIO_VIEW: &str = "studio_view";

/// Views that present a student-facing rendering of a block, as opposed to
/// an editing view. Requesting one of these triggers student binding.
pub const PREVIEW_VIEWS: &[&str] = &[STUDENT_VIEW, AUTHOR_VIEW];

/// Free-form context passed into a view.
pub type ViewContext = BTreeMap<String, Value>;

/// One block type's implementation.
///
/// A behavior declares its field schema and its views; everything
/// environment-specific (URLs, persistence, users) reaches it through the
/// block instance's bound runtime. Behaviors are registered in a
/// [`BlockTypeRegistry`](crate::registry::BlockTypeRegistry) and composed
/// with deployment capabilities by the [`Mixer`](crate::mixology::Mixer)
/// before instantiation.
///
/// Views default to [`RuntimeError::ViewNotSupported`];
/// `author_view` falls back to `student_view` so most types only implement
/// the latter.
pub trait BlockBehavior: Send + Sync {
    /// The registered type name (`"html"`, `"video"`, ...).
    fn block_type(&self) -> &str;

    /// The declared field schema, before capability composition.
    fn fields(&self) -> FieldSchema;

    /// Whether instances of this type carry child blocks.
    fn has_children(&self) -> bool {
        false
    }

    fn student_view(&self, _block: &BlockInstance, _context: &ViewContext) -> Result<Fragment> {
        Err(RuntimeError::view_not_supported(
            STUDENT_VIEW,
            self.block_type(),
        ))
    }

    fn author_view(&self, block: &BlockInstance, context: &ViewContext) -> Result<Fragment> {
        self.student_view(block, context)
    }

    fn studio_view(&self, _block: &BlockInstance, _context: &ViewContext) -> Result<Fragment> {
        Err(RuntimeError::view_not_supported(
            STUDIO_VIEW,
            self.block_type(),
        ))
    }

    /// Prepare the block's student-facing side.
    ///
    /// Called exactly once per instance, on the first student-facing render.
    /// A failure here does not abort the page: the runtime substitutes the
    /// designated error block instead.
    fn student_bind(&self, _block: &BlockInstance, _runtime: &StudentRuntime) -> Result<()> {
        Ok(())
    }

    /// Access hook run before a view is dispatched. Capabilities layer
    /// their checks on top of this.
    fn authorize_view(&self, _block: &BlockInstance, _view: &str) -> Result<()> {
        Ok(())
    }
}
