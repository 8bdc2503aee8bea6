//! # courseware-runtime
//!
//! The block runtime: type registry, capability composition, the
//! environment binders and the rendering pipeline.
//!
//! ## Core Concepts
//!
//! ### Blocks
//!
//! A **block** is one unit of course content - a problem, a video, a
//! container of other blocks. Block types are plugins: a
//! [`BlockBehavior`] declares a field schema and named views, and a
//! [`BlockTypeRegistry`] maps type names to implementations. At load time
//! every type is composed with the deployment's configured capability list
//! by the [`Mixer`], which adds cross-type fields (display name, staff
//! gating) without the type's code knowing.
//!
//! ### Runtimes
//!
//! Blocks are environment-agnostic; a **runtime** injects the environment.
//! The [`AuthoringRuntime`] carries descriptor-side services (block
//! resolution, policy, provenance, import/export) and the
//! [`StudentRuntime`] layers student-facing services on top. A block holds
//! at most one binding at a time, exposed as the [`RuntimeHandle`] facade;
//! the descriptor-to-student transition happens exactly once per instance,
//! on the first student-facing render, protected by an error fallback that
//! substitutes the designated error block instead of failing the page.
//!
//! ### Rendering
//!
//! [`RuntimeHandle::render`] resolves the requested view, dispatches it,
//! threads the result through the configured [`FragmentWrapper`] chain and
//! aside decoration, and emits one [`Telemetry`] event per attempt.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use courseware_fields::MemoryKvs;
//! use courseware_keys::{CourseKey, MemoryIdGenerator};
//! use courseware_runtime::{
//!     from_xml, register_defaults, AuthoringRuntime, BlockTypeRegistry, MemoryContentStore,
//!     Mixer, MixerConfig,
//! };
//!
//! let mut registry = BlockTypeRegistry::new();
//! register_defaults(&mut registry);
//!
//! let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
//! let runtime = AuthoringRuntime::new(
//!     Arc::new(registry),
//!     Arc::new(Mixer::new(MixerConfig { mixins: vec!["display_name".into()] })),
//!     Arc::new(MemoryContentStore::new()),
//!     Arc::new(MemoryIdGenerator::new(course.clone())),
//!     MemoryKvs::new().shared(),
//! )
//! .into_handle();
//!
//! let generator = MemoryIdGenerator::new(course);
//! let block = from_xml(
//!     r#"<html url_name="intro" display_name="Intro">Hello</html>"#,
//!     &runtime,
//!     &generator,
//! )
//! .unwrap();
//! assert_eq!(block.display_name_with_default(), "Intro");
//! ```

mod aside;
mod behavior;
mod block;
mod error;
mod fragment;
mod interchange;
mod library;
mod mixology;
mod pipeline;
mod registry;
mod runtime;
mod store;
pub mod xml;

pub use aside::{AsideBehavior, AsideInstance};
pub use behavior::{
    BlockBehavior, ViewContext, AUTHOR_VIEW, PREVIEW_VIEWS, STUDENT_VIEW, STUDIO_VIEW,
};
pub use block::BlockInstance;
pub use error::{Result, RuntimeError};
pub use fragment::{shim_block_js, Fragment};
pub use interchange::{
    export_to_xml, from_xml, DiskFs, MemoryFs, ResourceFs, ASIDE_FAMILY,
    ASIDE_FAMILY_ATTRIBUTE,
};
pub use library::{register_defaults, ErrorBlock, HtmlBlock, SequenceBlock, VerticalBlock};
pub use mixology::{
    Capability, DisplayNameCapability, Mixer, MixerConfig, StaffLockCapability,
};
pub use pipeline::{FragmentWrapper, Outcome, RenderEvent, Telemetry, TracingTelemetry};
pub use registry::BlockTypeRegistry;
pub use runtime::{
    AccessPolicy, AllowAll, AuthoringRuntime, FieldProvenance, HostServices, RuntimeHandle,
    StaffVisibilityPolicy, StudentRuntime, UnimplementedHost, UserContext,
};
pub use store::{ContentStore, MemoryContentStore};

// Re-export the layers below for convenience.
pub use courseware_fields as fields;
pub use courseware_keys as keys;
