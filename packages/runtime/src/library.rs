//! Built-in block types.
//!
//! The minimal library a deployment starts from: markup content, the two
//! standard containers, and the designated error block the runtime
//! substitutes when student construction fails.

use std::sync::Arc;

use courseware_fields::{FieldDescriptor, FieldSchema, Scope, Value};

use crate::behavior::{BlockBehavior, ViewContext, STUDENT_VIEW};
use crate::block::BlockInstance;
use crate::error::Result;
use crate::fragment::{escape_html, Fragment};
use crate::registry::BlockTypeRegistry;

/// Register the built-in block types.
pub fn register_defaults(registry: &mut BlockTypeRegistry) {
    registry.register(Arc::new(HtmlBlock));
    registry.register(Arc::new(SequenceBlock));
    registry.register(Arc::new(VerticalBlock));
    registry.register(Arc::new(ErrorBlock));
}

/// Raw markup content.
pub struct HtmlBlock;

impl BlockBehavior for HtmlBlock {
    fn block_type(&self) -> &str {
        "html"
    }

    fn fields(&self) -> FieldSchema {
        FieldSchema::new().with_field(
            FieldDescriptor::new("data", Scope::Content)
                .with_default(Value::String(String::new())),
        )
    }

    fn student_view(&self, block: &BlockInstance, _context: &ViewContext) -> Result<Fragment> {
        let data = block.get_field("data")?;
        Ok(Fragment::new(data.to_attribute()))
    }

    fn studio_view(&self, block: &BlockInstance, _context: &ViewContext) -> Result<Fragment> {
        let data = block.get_field("data")?;
        Ok(Fragment::new(format!(
            "<textarea class=\"html-editor\">{}</textarea>",
            escape_html(&data.to_attribute())
        )))
    }
}

fn render_children(
    block: &BlockInstance,
    context: &ViewContext,
    open: &str,
    item_open: &str,
    item_close: &str,
    close: &str,
) -> Result<Fragment> {
    let runtime = block.runtime()?;
    let children = block.get_children()?;
    let mut rendered = Vec::with_capacity(children.len());
    for child in &children {
        rendered.push(runtime.render(child, STUDENT_VIEW, context)?);
    }

    let mut body = String::from(open);
    for piece in &rendered {
        body.push_str(item_open);
        body.push_str(piece.content());
        body.push_str(item_close);
    }
    body.push_str(close);

    let mut fragment = Fragment::new(body);
    for piece in &rendered {
        fragment.absorb_resources(piece);
    }
    Ok(fragment)
}

/// A horizontal sequence of child blocks with a per-student position.
pub struct SequenceBlock;

impl BlockBehavior for SequenceBlock {
    fn block_type(&self) -> &str {
        "sequence"
    }

    fn fields(&self) -> FieldSchema {
        FieldSchema::new().with_field(
            FieldDescriptor::new("position", Scope::UserState)
                .with_default(Value::Integer(0)),
        )
    }

    fn has_children(&self) -> bool {
        true
    }

    fn student_view(&self, block: &BlockInstance, context: &ViewContext) -> Result<Fragment> {
        render_children(
            block,
            context,
            "<ol class=\"sequence\">",
            "<li class=\"sequence-item\">",
            "</li>",
            "</ol>",
        )
    }
}

/// A vertical stack of child blocks.
pub struct VerticalBlock;

impl BlockBehavior for VerticalBlock {
    fn block_type(&self) -> &str {
        "vertical"
    }

    fn fields(&self) -> FieldSchema {
        FieldSchema::new()
    }

    fn has_children(&self) -> bool {
        true
    }

    fn student_view(&self, block: &BlockInstance, context: &ViewContext) -> Result<Fragment> {
        render_children(
            block,
            context,
            "<div class=\"vertical\">",
            "",
            "",
            "</div>",
        )
    }
}

/// The designated substitution type: shows the failure inline so the rest
/// of the page can render normally.
pub struct ErrorBlock;

impl BlockBehavior for ErrorBlock {
    fn block_type(&self) -> &str {
        "error"
    }

    fn fields(&self) -> FieldSchema {
        FieldSchema::new().with_field(
            FieldDescriptor::new("error_message", Scope::Content)
                .with_default(Value::String(String::new())),
        )
    }

    fn student_view(&self, block: &BlockInstance, _context: &ViewContext) -> Result<Fragment> {
        let message = block.get_field("error_message")?;
        Ok(Fragment::new(format!(
            "<div class=\"error-block\"><p>This component could not be shown.</p><pre>{}</pre></div>",
            escape_html(&message.to_attribute())
        )))
    }

    fn studio_view(&self, block: &BlockInstance, context: &ViewContext) -> Result<Fragment> {
        self.student_view(block, context)
    }
}
