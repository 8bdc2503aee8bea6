//! # courseware-fields
//!
//! The typed field bag behind every content block.
//!
//! A block declares a schema of named fields. Each field has a
//! [`Scope`] - authoring settings, content payload, or per-student state -
//! and a [`FieldKind`] saying whether the value is plain data or a
//! reference to other block usages. Field values live in a backing
//! [`KeyValueStore`] keyed by `(scope, usage, field, user)`.
//!
//! Blocks do not talk to the store directly: they go through [`FieldData`],
//! a per-block caching view. Writes land in the cache and mark the field
//! dirty; nothing reaches the store until the explicit [`FieldData::save`]
//! call. Persistence code must trigger a save before it hands the store to
//! anything else.
//!
//! # Example
//!
//! ```rust
//! use courseware_fields::{FieldData, FieldKey, MemoryKvs, Scope, Value};
//! use courseware_keys::{CourseKey, UsageId};
//!
//! let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
//! let usage = UsageId::new(course, "html", "intro").unwrap();
//!
//! let mut data = FieldData::new(MemoryKvs::new().shared());
//! let key = FieldKey::new(Scope::Settings, usage, "display_name");
//! data.set(key.clone(), Value::from("Introduction"));
//! assert!(data.is_dirty());
//! data.save();
//! assert!(!data.is_dirty());
//! ```

mod error;
mod field_data;
mod kvs;
mod schema;
mod scope;
mod value;

pub use error::FieldError;
pub use field_data::FieldData;
pub use kvs::{KeyValueStore, MemoryKvs, SharedKvs};
pub use schema::{FieldDescriptor, FieldKind, FieldSchema};
pub use scope::{FieldKey, Scope};
pub use value::Value;
