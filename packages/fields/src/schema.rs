//! Field declarations and the per-type schema.

use std::collections::BTreeMap;

use courseware_keys::{CourseKey, UsageId};

use crate::error::FieldError;
use crate::scope::Scope;
use crate::value::Value;

/// Whether a field holds plain data or references to other block usages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Plain,
    /// A single usage reference.
    Reference,
    /// An ordered list of usage references.
    ReferenceList,
    /// A string-keyed map of usage references.
    ReferenceMap,
}

/// Declaration of one field: name, scope, kind, default, editor metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub scope: Scope,
    pub kind: FieldKind,
    pub default: Value,
    pub display_name: Option<String>,
    pub help: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
            kind: FieldKind::Plain,
            default: Value::Null,
            display_name: None,
            help: None,
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Read a flat attribute string into a value for this field.
    ///
    /// Reference kinds resolve against the course; plain kinds take the
    /// shape of the declared default, falling back to a bare string.
    pub fn value_from_attribute(
        &self,
        course: &CourseKey,
        raw: &str,
    ) -> Result<Value, FieldError> {
        let bad_reference = |reference: &str| FieldError::BadReference {
            field: self.name.clone(),
            reference: reference.to_string(),
        };

        match self.kind {
            FieldKind::Reference => {
                let usage =
                    UsageId::resolve(course, raw).map_err(|_| bad_reference(raw))?;
                Ok(Value::Usage(usage))
            }
            FieldKind::ReferenceList => {
                let items: Vec<String> =
                    serde_json::from_str(raw).map_err(|_| bad_reference(raw))?;
                let mut resolved = Vec::with_capacity(items.len());
                for item in &items {
                    resolved.push(Value::Usage(
                        UsageId::resolve(course, item).map_err(|_| bad_reference(item))?,
                    ));
                }
                Ok(Value::List(resolved))
            }
            FieldKind::ReferenceMap => {
                let items: BTreeMap<String, String> =
                    serde_json::from_str(raw).map_err(|_| bad_reference(raw))?;
                let mut resolved = BTreeMap::new();
                for (key, item) in &items {
                    resolved.insert(
                        key.clone(),
                        Value::Usage(
                            UsageId::resolve(course, item).map_err(|_| bad_reference(item))?,
                        ),
                    );
                }
                Ok(Value::Map(resolved))
            }
            FieldKind::Plain => Ok(self.plain_from_attribute(raw)),
        }
    }

    fn plain_from_attribute(&self, raw: &str) -> Value {
        match &self.default {
            Value::Bool(_) => raw
                .parse::<bool>()
                .map(Value::Bool)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            Value::Integer(_) => raw
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            Value::Float(_) => raw
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            Value::List(_) | Value::Map(_) => serde_json::from_str(raw)
                .map(|json| Value::from_json(&json))
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            _ => Value::String(raw.to_string()),
        }
    }
}

/// The declared fields of one block type.
///
/// Merging is deterministic and idempotent: merging the same schemas in the
/// same order always produces the same result, and re-merging a schema that
/// is already present changes nothing. Capability composition relies on
/// this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSchema {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field declaration, replacing any previous one of the same name.
    pub fn with_field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&FieldDescriptor, FieldError> {
        self.get(name).ok_or_else(|| FieldError::UnknownField {
            field: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge another schema into this one. Later declarations win on name
    /// collisions.
    #[must_use]
    pub fn merged(mut self, other: &FieldSchema) -> Self {
        for descriptor in other.iter() {
            self.fields
                .insert(descriptor.name.clone(), descriptor.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> CourseKey {
        CourseKey::new("edX", "DemoX", "2026").unwrap()
    }

    #[test]
    fn merge_is_idempotent() {
        let base = FieldSchema::new()
            .with_field(FieldDescriptor::new("data", Scope::Content))
            .with_field(FieldDescriptor::new("display_name", Scope::Settings));
        let extra = FieldSchema::new()
            .with_field(FieldDescriptor::new("weight", Scope::Settings).with_default(Value::Integer(1)));

        let once = base.clone().merged(&extra);
        let twice = once.clone().merged(&extra);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn later_declaration_wins() {
        let schema = FieldSchema::new()
            .with_field(FieldDescriptor::new("weight", Scope::Settings).with_default(Value::Integer(1)))
            .merged(
                &FieldSchema::new().with_field(
                    FieldDescriptor::new("weight", Scope::Settings).with_default(Value::Integer(5)),
                ),
            );
        assert_eq!(schema.get("weight").unwrap().default, Value::Integer(5));
    }

    #[test]
    fn plain_attribute_takes_default_shape() {
        let int_field =
            FieldDescriptor::new("attempts", Scope::Settings).with_default(Value::Integer(0));
        assert_eq!(
            int_field.value_from_attribute(&course(), "3").unwrap(),
            Value::Integer(3)
        );

        let bool_field =
            FieldDescriptor::new("graded", Scope::Settings).with_default(Value::Bool(false));
        assert_eq!(
            bool_field.value_from_attribute(&course(), "true").unwrap(),
            Value::Bool(true)
        );

        let string_field = FieldDescriptor::new("display_name", Scope::Settings);
        assert_eq!(
            string_field.value_from_attribute(&course(), "Week 1").unwrap(),
            Value::from("Week 1")
        );
    }

    #[test]
    fn reference_attribute_resolves() {
        let field =
            FieldDescriptor::new("source", Scope::Settings).with_kind(FieldKind::Reference);
        let value = field
            .value_from_attribute(&course(), "video@welcome")
            .unwrap();
        let usage = value.as_usage().unwrap();
        assert_eq!(usage.block_type(), "video");
        assert_eq!(usage.course(), &course());
    }

    #[test]
    fn reference_list_attribute_resolves() {
        let field =
            FieldDescriptor::new("sources", Scope::Settings).with_kind(FieldKind::ReferenceList);
        let value = field
            .value_from_attribute(&course(), r#"["video@a", "video@b"]"#)
            .unwrap();
        let list = value.as_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].as_usage().unwrap().name(), "a");
    }

    #[test]
    fn bad_reference_is_an_error() {
        let field =
            FieldDescriptor::new("source", Scope::Settings).with_kind(FieldKind::Reference);
        assert!(matches!(
            field.value_from_attribute(&course(), "not a reference"),
            Err(FieldError::BadReference { .. })
        ));
    }
}
