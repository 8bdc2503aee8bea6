//! Side-annotations attached to blocks.
//!
//! An aside layers extra markup onto another block's rendered output
//! without touching that block's definition. Aside identity derives from
//! the annotated block's identity plus the aside type; the instance itself
//! only holds the captured annotation payload.

use std::collections::BTreeMap;

use courseware_fields::Value;
use courseware_keys::{AsideDefinitionId, AsideUsageId};

use crate::block::BlockInstance;
use crate::fragment::Fragment;

/// One aside annotation on one block usage.
#[derive(Debug, Clone, PartialEq)]
pub struct AsideInstance {
    def_id: AsideDefinitionId,
    usage_id: AsideUsageId,
    data: BTreeMap<String, Value>,
    body: String,
}

impl AsideInstance {
    pub fn new(
        def_id: AsideDefinitionId,
        usage_id: AsideUsageId,
        data: BTreeMap<String, Value>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            def_id,
            usage_id,
            data,
            body: body.into(),
        }
    }

    pub fn def_id(&self) -> &AsideDefinitionId {
        &self.def_id
    }

    pub fn usage_id(&self) -> &AsideUsageId {
        &self.usage_id
    }

    pub fn aside_type(&self) -> &str {
        self.usage_id.aside_type()
    }

    /// The captured annotation attributes.
    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// The captured annotation text body.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// An aside type's implementation.
pub trait AsideBehavior: Send + Sync {
    /// The registered aside type name.
    fn aside_type(&self) -> &str;

    /// Decorate a block's rendered fragment. The default leaves the
    /// fragment untouched.
    fn aside_view(
        &self,
        _aside: &AsideInstance,
        _block: &BlockInstance,
        fragment: Fragment,
    ) -> Fragment {
        fragment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseware_keys::{CourseKey, DefinitionId, UsageId};

    #[test]
    fn instance_accessors() {
        let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
        let usage = UsageId::new(course, "video", "welcome").unwrap();
        let def = DefinitionId::new("video", "welcome").unwrap();
        let aside_def = AsideDefinitionId::new(def, "notes").unwrap();
        let aside_usage = AsideUsageId::new(usage.clone(), "notes").unwrap();

        let mut data = BTreeMap::new();
        data.insert("color".to_string(), Value::from("yellow"));
        let aside = AsideInstance::new(aside_def, aside_usage, data, "remember this");

        assert_eq!(aside.aside_type(), "notes");
        assert_eq!(aside.usage_id().usage(), &usage);
        assert_eq!(aside.data().get("color"), Some(&Value::from("yellow")));
        assert_eq!(aside.body(), "remember this");
    }
}
