//! The identity triple attached to every block instance.

use crate::definition::DefinitionId;
use crate::usage::UsageId;

/// The identity of one block instance: block type, definition and usage.
///
/// Set once at construction. When a block is relocated the whole triple is
/// rewritten together via [`ScopeIds::relocated`] - there is no way to
/// rewrite the definition and usage halves independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeIds {
    block_type: String,
    def_id: DefinitionId,
    usage_id: UsageId,
}

impl ScopeIds {
    pub fn new(block_type: impl Into<String>, def_id: DefinitionId, usage_id: UsageId) -> Self {
        Self {
            block_type: block_type.into(),
            def_id,
            usage_id,
        }
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn def_id(&self) -> &DefinitionId {
        &self.def_id
    }

    pub fn usage_id(&self) -> &UsageId {
        &self.usage_id
    }

    /// A copy of this triple relocated to a new usage.
    ///
    /// The definition key is rewritten to the new placement's name in the
    /// same step, so the triple never holds a half-moved state.
    #[must_use]
    pub fn relocated(&self, usage_id: UsageId) -> Self {
        let def_id = DefinitionId::new(usage_id.block_type(), usage_id.name())
            .expect("usage components were already validated");
        Self {
            block_type: usage_id.block_type().to_string(),
            def_id,
            usage_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::CourseKey;

    #[test]
    fn relocated_rewrites_all_three() {
        let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
        let ids = ScopeIds::new(
            "video",
            DefinitionId::new("video", "old").unwrap(),
            UsageId::new(course.clone(), "video", "old").unwrap(),
        );

        let moved = ids.relocated(UsageId::new(course, "video", "new_home").unwrap());
        assert_eq!(moved.usage_id().name(), "new_home");
        assert_eq!(moved.def_id().name(), "new_home");
        assert_eq!(moved.block_type(), "video");
        // the original is untouched
        assert_eq!(ids.usage_id().name(), "old");
    }
}
