//! Usage identifiers - placements of a definition inside a course.

use std::fmt;
use std::str::FromStr;

use crate::component;
use crate::course::CourseKey;
use crate::error::KeyError;

/// Identifies one placement of a definition within a specific course.
///
/// This is the external-facing handle for a block: URLs, persistence keys
/// and reference fields all speak in usage ids. Immutable once created.
///
/// Serialized form: `block-v1:{org}+{course}+{run}:{block_type}@{name}`.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct UsageId {
    course: CourseKey,
    block_type: String,
    name: String,
}

const PREFIX: &str = "block-v1:";

impl UsageId {
    /// Create a usage id inside the given course.
    pub fn new(
        course: CourseKey,
        block_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let block_type = block_type.into();
        let name = name.into();
        component::validate(&block_type)?;
        component::validate(&name)?;
        Ok(Self {
            course,
            block_type,
            name,
        })
    }

    /// Resolve a serialized reference relative to a course.
    ///
    /// Accepts either the full `block-v1:` form (which must belong to
    /// `course`) or the short `{block_type}@{name}` form used inside field
    /// payloads and XML attributes.
    pub fn resolve(course: &CourseKey, reference: &str) -> Result<Self, KeyError> {
        if reference.starts_with(PREFIX) {
            let usage: UsageId = reference.parse()?;
            if usage.course != *course {
                return Err(KeyError::InvalidKey {
                    kind: "UsageId",
                    raw: reference.to_string(),
                });
            }
            return Ok(usage);
        }
        let (block_type, name) = reference.split_once('@').ok_or_else(|| KeyError::InvalidKey {
            kind: "UsageId",
            raw: reference.to_string(),
        })?;
        UsageId::new(course.clone(), block_type, name)
    }

    /// The course this placement belongs to.
    pub fn course(&self) -> &CourseKey {
        &self.course
    }

    /// The block type at this placement.
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// The placement name, unique within the course.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The short `{block_type}@{name}` form, valid relative to the course.
    pub fn short_form(&self) -> String {
        format!("{}@{}", self.block_type, self.name)
    }
}

impl fmt::Display for UsageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}+{}+{}:{}@{}",
            PREFIX,
            self.course.org(),
            self.course.course(),
            self.course.run(),
            self.block_type,
            self.name
        )
    }
}

impl FromStr for UsageId {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidKey {
            kind: "UsageId",
            raw: s.to_string(),
        };
        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (course_part, block_part) = rest.split_once(':').ok_or_else(invalid)?;
        let mut parts = course_part.split('+');
        let org = parts.next().ok_or_else(invalid)?;
        let course = parts.next().ok_or_else(invalid)?;
        let run = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        let course = CourseKey::new(org, course, run).map_err(|_| invalid())?;
        let (block_type, name) = block_part.split_once('@').ok_or_else(invalid)?;
        UsageId::new(course, block_type, name).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> CourseKey {
        CourseKey::new("edX", "DemoX", "2026").unwrap()
    }

    #[test]
    fn display_round_trips() {
        let usage = UsageId::new(course(), "video", "welcome").unwrap();
        assert_eq!(usage.to_string(), "block-v1:edX+DemoX+2026:video@welcome");
        assert_eq!(usage.to_string().parse::<UsageId>().unwrap(), usage);
    }

    #[test]
    fn resolve_short_form() {
        let usage = UsageId::resolve(&course(), "html@intro").unwrap();
        assert_eq!(usage.block_type(), "html");
        assert_eq!(usage.name(), "intro");
        assert_eq!(usage.course(), &course());
    }

    #[test]
    fn resolve_full_form() {
        let usage = UsageId::new(course(), "video", "welcome").unwrap();
        let resolved = UsageId::resolve(&course(), &usage.to_string()).unwrap();
        assert_eq!(resolved, usage);
    }

    #[test]
    fn resolve_rejects_foreign_course() {
        let other = CourseKey::new("MITx", "6_002x", "2026").unwrap();
        let usage = UsageId::new(other, "video", "welcome").unwrap();
        assert!(UsageId::resolve(&course(), &usage.to_string()).is_err());
    }

    #[test]
    fn short_form_resolves_back() {
        let usage = UsageId::new(course(), "problem", "quiz_1").unwrap();
        assert_eq!(UsageId::resolve(&course(), &usage.short_form()).unwrap(), usage);
    }
}
