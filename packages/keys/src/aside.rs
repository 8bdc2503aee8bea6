//! Composite identifiers for side-annotations ("asides").
//!
//! An aside never exists independent of the block it annotates: its keys are
//! pure functions of the annotated block's keys plus the aside type, and
//! they hold the underlying id by value without owning the block's
//! lifecycle in any way - lookup only.

use std::fmt;
use std::str::FromStr;

use crate::component;
use crate::definition::DefinitionId;
use crate::error::KeyError;
use crate::usage::UsageId;

const MARKER: &str = "::aside-v1@";

/// Layers an annotation type onto a [`DefinitionId`].
///
/// Serialized form: `{definition}::aside-v1@{aside_type}`.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AsideDefinitionId {
    of: DefinitionId,
    aside_type: String,
}

impl AsideDefinitionId {
    pub fn new(of: DefinitionId, aside_type: impl Into<String>) -> Result<Self, KeyError> {
        let aside_type = aside_type.into();
        component::validate(&aside_type)?;
        Ok(Self { of, aside_type })
    }

    /// The definition this aside comments on.
    pub fn definition(&self) -> &DefinitionId {
        &self.of
    }

    pub fn aside_type(&self) -> &str {
        &self.aside_type
    }
}

impl fmt::Display for AsideDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.of, MARKER, self.aside_type)
    }
}

impl FromStr for AsideDefinitionId {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidKey {
            kind: "AsideDefinitionId",
            raw: s.to_string(),
        };
        let (def, aside_type) = s.rsplit_once(MARKER).ok_or_else(invalid)?;
        let of: DefinitionId = def.parse().map_err(|_| invalid())?;
        AsideDefinitionId::new(of, aside_type).map_err(|_| invalid())
    }
}

/// Layers an annotation type onto a [`UsageId`].
///
/// Serialized form: `{usage}::aside-v1@{aside_type}`.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AsideUsageId {
    of: UsageId,
    aside_type: String,
}

impl AsideUsageId {
    pub fn new(of: UsageId, aside_type: impl Into<String>) -> Result<Self, KeyError> {
        let aside_type = aside_type.into();
        component::validate(&aside_type)?;
        Ok(Self { of, aside_type })
    }

    /// The usage this aside comments on.
    pub fn usage(&self) -> &UsageId {
        &self.of
    }

    pub fn aside_type(&self) -> &str {
        &self.aside_type
    }
}

impl fmt::Display for AsideUsageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.of, MARKER, self.aside_type)
    }
}

impl FromStr for AsideUsageId {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidKey {
            kind: "AsideUsageId",
            raw: s.to_string(),
        };
        let (usage, aside_type) = s.rsplit_once(MARKER).ok_or_else(invalid)?;
        let of: UsageId = usage.parse().map_err(|_| invalid())?;
        AsideUsageId::new(of, aside_type).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::CourseKey;

    fn usage() -> UsageId {
        let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
        UsageId::new(course, "video", "welcome").unwrap()
    }

    #[test]
    fn aside_usage_round_trips() {
        let aside = AsideUsageId::new(usage(), "acid_aside").unwrap();
        assert_eq!(aside.to_string().parse::<AsideUsageId>().unwrap(), aside);
        assert_eq!(aside.usage(), &usage());
        assert_eq!(aside.aside_type(), "acid_aside");
    }

    #[test]
    fn aside_definition_round_trips() {
        let def = DefinitionId::new("video", "welcome").unwrap();
        let aside = AsideDefinitionId::new(def.clone(), "acid_aside").unwrap();
        assert_eq!(
            aside.to_string().parse::<AsideDefinitionId>().unwrap(),
            aside
        );
        assert_eq!(aside.definition(), &def);
    }

    #[test]
    fn same_inputs_yield_equal_ids() {
        let a = AsideUsageId::new(usage(), "notes").unwrap();
        let b = AsideUsageId::new(usage(), "notes").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_aside_type_rejected() {
        assert!(AsideUsageId::new(usage(), "a b").is_err());
    }
}
