//! # courseware-keys
//!
//! Opaque, structured identifiers for course content.
//!
//! Two identifier families exist:
//!
//! - [`DefinitionId`]: identifies a reusable piece of content (a block type
//!   plus a payload key). Reusable across placements.
//! - [`UsageId`]: identifies one placement of a definition inside a specific
//!   course. This is the external-facing handle for a block.
//!
//! Both can be layered with an annotation type to form [`AsideDefinitionId`]
//! and [`AsideUsageId`]: composite keys for side-annotations that never
//! exist independent of the block they comment on.
//!
//! Identifiers are immutable once created and have a stable string form that
//! round-trips through `Display`/`parse`.
//!
//! # Example
//!
//! ```rust
//! use courseware_keys::{CourseKey, UsageId};
//!
//! let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
//! let usage = UsageId::new(course, "video", "welcome").unwrap();
//! assert_eq!(usage.to_string().parse::<UsageId>().unwrap(), usage);
//! ```

mod aside;
mod component;
mod course;
mod definition;
mod error;
mod generator;
mod scope_ids;
mod usage;

pub use aside::{AsideDefinitionId, AsideUsageId};
pub use course::CourseKey;
pub use definition::DefinitionId;
pub use error::KeyError;
pub use generator::{IdGenerator, MemoryIdGenerator};
pub use scope_ids::ScopeIds;
pub use usage::UsageId;
