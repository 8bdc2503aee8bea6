//! The tree-shaped field value type.

use std::collections::BTreeMap;

use courseware_keys::UsageId;

/// A field value.
///
/// This is the universal in-memory representation for block field state.
/// It maps onto JSON for policy payloads and the metadata editor, with one
/// addition: [`Value::Usage`] holds a resolved block reference as a typed
/// identifier instead of a string.
///
/// Uses `BTreeMap` for deterministic ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Distinct from "field not set".
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// A resolved reference to another block usage.
    Usage(UsageId),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty list.
    pub fn list() -> Self {
        Value::List(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_usage(&self) -> Option<&UsageId> {
        match self {
            Value::Usage(usage) => Some(usage),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Serialize for an XML attribute or other flat text position.
    ///
    /// Strings are emitted bare; usages as their short form; containers as
    /// JSON text.
    pub fn to_attribute(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Usage(usage) => usage.short_form(),
            Value::List(_) | Value::Map(_) => self.to_json().to_string(),
        }
    }

    /// Convert to a JSON value.
    ///
    /// Usage references become their full serialized string form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Usage(usage) => serde_json::Value::String(usage.to_string()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Convert from a JSON value. Strings stay strings; reference fields are
    /// resolved separately by the hydration step that knows the field kind.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<UsageId> for Value {
    fn from(usage: UsageId) -> Self {
        Value::Usage(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseware_keys::CourseKey;

    fn usage() -> UsageId {
        let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
        UsageId::new(course, "video", "welcome").unwrap()
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(7i64).as_integer(), Some(7));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Usage(usage()).as_usage(), Some(&usage()));
    }

    #[test]
    fn attribute_forms() {
        assert_eq!(Value::from("hello").to_attribute(), "hello");
        assert_eq!(Value::from(3i64).to_attribute(), "3");
        assert_eq!(Value::from(true).to_attribute(), "true");
        assert_eq!(Value::Usage(usage()).to_attribute(), "video@welcome");
    }

    #[test]
    fn list_attribute_is_json() {
        let list = Value::List(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(list.to_attribute(), r#"["a","b"]"#);
    }

    #[test]
    fn json_round_trips_plain_values() {
        for value in [
            Value::Null,
            Value::from(true),
            Value::from(42i64),
            Value::from("text"),
            Value::List(vec![Value::from(1i64), Value::from(2i64)]),
        ] {
            assert_eq!(Value::from_json(&value.to_json()), value);
        }
    }

    #[test]
    fn usage_converts_to_json_string() {
        let json = Value::Usage(usage()).to_json();
        assert_eq!(
            json,
            serde_json::Value::String("block-v1:edX+DemoX+2026:video@welcome".to_string())
        );
    }
}
