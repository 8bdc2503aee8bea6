//! Error types for the block runtime.

use courseware_fields::FieldError;
use courseware_keys::{KeyError, UsageId};
use thiserror::Error;

use crate::xml::XmlError;

/// Errors that can occur in the block runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No implementation is registered for the block type.
    #[error("unknown block type: {0}")]
    UnknownBlockType(String),

    /// The deployment configuration names a capability that is not
    /// registered.
    #[error("capability not supported: {0}")]
    CapabilityNotSupported(String),

    /// The backing store has no item for the usage. Recoverable: tree
    /// traversal skips the missing child, other callers decide.
    #[error("item not found: {0}")]
    ItemNotFound(UsageId),

    /// A runtime service was used before any runtime was bound. This is a
    /// programming error, not an expected case.
    #[error("runtime service '{0}' used before binding")]
    UnboundRuntime(&'static str),

    /// The block does not implement the requested view.
    #[error("view '{view}' not supported by block type '{block_type}'")]
    ViewNotSupported { view: String, block_type: String },

    /// A caller violated an argument contract (negative depth etc.).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A host integration point that the application has not supplied yet.
    #[error("host application must supply {0}")]
    NotImplemented(&'static str),

    /// The current user may not see the block.
    #[error("access denied: {0}")]
    AccessDenied(UsageId),

    /// Student-facing construction failed and the error-block substitution
    /// failed too. Not recovered a second time.
    #[error("student binding failed: {0}")]
    StudentBindFailed(String),

    /// An identifier could not be built or parsed.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// A field lookup or conversion failed.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// The interchange payload is not well-formed XML.
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),

    /// An I/O error from a resource filesystem.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub(crate) fn view_not_supported(view: &str, block_type: &str) -> Self {
        RuntimeError::ViewNotSupported {
            view: view.to_string(),
            block_type: block_type.to_string(),
        }
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
