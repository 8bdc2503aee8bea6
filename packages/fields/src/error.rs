//! Error types for the field layer.

use thiserror::Error;

/// Errors raised by schema lookups and value conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The field is not declared in the block's schema.
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    /// A serialized value does not fit the declared field.
    #[error("cannot read '{raw}' into field '{field}': {message}")]
    BadValue {
        field: String,
        raw: String,
        message: String,
    },

    /// A reference payload could not be resolved against the course.
    #[error("unresolvable reference in field '{field}': {reference}")]
    BadReference { field: String, reference: String },
}
