//! Error types for identifier parsing and construction.

use thiserror::Error;

/// Errors raised while constructing or parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A key component contains a reserved character or is empty.
    #[error("invalid key component '{component}': {message}")]
    InvalidComponent { component: String, message: String },

    /// A serialized key string does not match the expected shape.
    #[error("cannot parse '{raw}' as {kind}")]
    InvalidKey { kind: &'static str, raw: String },
}
