//! Definition identifiers.

use std::fmt;
use std::str::FromStr;

use crate::component;
use crate::error::KeyError;

/// Identifies a reusable piece of content: a block type plus a payload key.
///
/// Definitions are placement-agnostic; the same definition may back several
/// [`UsageId`](crate::UsageId)s. Immutable once created.
///
/// Serialized form: `def-v1:{block_type}@{name}`.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DefinitionId {
    block_type: String,
    name: String,
}

const PREFIX: &str = "def-v1:";

impl DefinitionId {
    /// Create a definition id, validating both components.
    pub fn new(block_type: impl Into<String>, name: impl Into<String>) -> Result<Self, KeyError> {
        let block_type = block_type.into();
        let name = name.into();
        component::validate(&block_type)?;
        component::validate(&name)?;
        Ok(Self { block_type, name })
    }

    /// The block type this definition instantiates.
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// The opaque payload key.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}@{}", PREFIX, self.block_type, self.name)
    }
}

impl FromStr for DefinitionId {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidKey {
            kind: "DefinitionId",
            raw: s.to_string(),
        };
        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (block_type, name) = rest.split_once('@').ok_or_else(invalid)?;
        DefinitionId::new(block_type, name).map_err(|_| invalid())
    }
}
