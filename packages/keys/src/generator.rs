//! Identifier allocation.

use uuid::Uuid;

use crate::aside::{AsideDefinitionId, AsideUsageId};
use crate::course::CourseKey;
use crate::definition::DefinitionId;
use crate::error::KeyError;
use crate::usage::UsageId;

/// Allocates new identifiers during import and authoring.
///
/// Aside ids are pure functions of their inputs, so `create_aside` has a
/// default body; definition and usage allocation is generator-specific
/// because any bookkeeping (slug uniqueness, persistence) belongs to the
/// generator, not to this crate.
pub trait IdGenerator: Send + Sync {
    /// Make a definition id for a block type.
    ///
    /// `slug` is a suggestion that the id incorporate the given name.
    fn create_definition(
        &self,
        block_type: &str,
        slug: Option<&str>,
    ) -> Result<DefinitionId, KeyError>;

    /// Make a usage id for a placement of `def_id`.
    fn create_usage(&self, def_id: &DefinitionId) -> Result<UsageId, KeyError>;

    /// Make the aside id pair for an annotation on an existing block.
    fn create_aside(
        &self,
        def_id: &DefinitionId,
        usage_id: &UsageId,
        aside_type: &str,
    ) -> Result<(AsideDefinitionId, AsideUsageId), KeyError> {
        Ok((
            AsideDefinitionId::new(def_id.clone(), aside_type)?,
            AsideUsageId::new(usage_id.clone(), aside_type)?,
        ))
    }
}

/// In-memory generator scoped to one course.
///
/// Uses the slug when one is suggested and a random fragment otherwise.
pub struct MemoryIdGenerator {
    course: CourseKey,
}

impl MemoryIdGenerator {
    pub fn new(course: CourseKey) -> Self {
        Self { course }
    }

    pub fn course(&self) -> &CourseKey {
        &self.course
    }

    fn fresh_name() -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        uuid[..12].to_string()
    }
}

impl IdGenerator for MemoryIdGenerator {
    fn create_definition(
        &self,
        block_type: &str,
        slug: Option<&str>,
    ) -> Result<DefinitionId, KeyError> {
        match slug {
            Some(slug) => DefinitionId::new(block_type, slug),
            None => DefinitionId::new(block_type, Self::fresh_name()),
        }
    }

    fn create_usage(&self, def_id: &DefinitionId) -> Result<UsageId, KeyError> {
        UsageId::new(self.course.clone(), def_id.block_type(), def_id.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> MemoryIdGenerator {
        MemoryIdGenerator::new(CourseKey::new("edX", "DemoX", "2026").unwrap())
    }

    #[test]
    fn slug_is_incorporated() {
        let def = generator().create_definition("html", Some("intro")).unwrap();
        assert_eq!(def.block_type(), "html");
        assert_eq!(def.name(), "intro");
    }

    #[test]
    fn slugless_definitions_are_distinct() {
        let generator = generator();
        let a = generator.create_definition("html", None).unwrap();
        let b = generator.create_definition("html", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn usage_derives_from_definition() {
        let generator = generator();
        let def = generator.create_definition("video", Some("welcome")).unwrap();
        let usage = generator.create_usage(&def).unwrap();
        assert_eq!(usage.block_type(), "video");
        assert_eq!(usage.name(), "welcome");
        assert_eq!(usage.course(), generator.course());
    }

    #[test]
    fn aside_ids_are_deterministic() {
        let generator = generator();
        let def = generator.create_definition("video", Some("welcome")).unwrap();
        let usage = generator.create_usage(&def).unwrap();
        let (ad1, au1) = generator.create_aside(&def, &usage, "notes").unwrap();
        let (ad2, au2) = generator.create_aside(&def, &usage, "notes").unwrap();
        assert_eq!(ad1, ad2);
        assert_eq!(au1, au2);
        assert_eq!(au1.usage(), &usage);
    }
}
