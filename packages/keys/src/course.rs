//! The course context key.

use std::fmt;
use std::str::FromStr;

use crate::component;
use crate::error::KeyError;

/// Identifies one run of one course.
///
/// Every [`UsageId`](crate::UsageId) carries a `CourseKey`: block references
/// serialized inside field payloads are resolved relative to a course, never
/// treated as opaque strings.
///
/// Serialized form: `course-v1:{org}+{course}+{run}`.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CourseKey {
    org: String,
    course: String,
    run: String,
}

const PREFIX: &str = "course-v1:";

impl CourseKey {
    /// Create a course key, validating each component.
    pub fn new(
        org: impl Into<String>,
        course: impl Into<String>,
        run: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let org = org.into();
        let course = course.into();
        let run = run.into();
        component::validate(&org)?;
        component::validate(&course)?;
        component::validate(&run)?;
        Ok(Self { org, course, run })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn run(&self) -> &str {
        &self.run
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}+{}+{}", PREFIX, self.org, self.course, self.run)
    }
}

impl FromStr for CourseKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidKey {
            kind: "CourseKey",
            raw: s.to_string(),
        };
        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let mut parts = rest.split('+');
        let org = parts.next().ok_or_else(invalid)?;
        let course = parts.next().ok_or_else(invalid)?;
        let run = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        CourseKey::new(org, course, run).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips() {
        let key = CourseKey::new("edX", "DemoX", "2026_T1").unwrap();
        assert_eq!(key.to_string(), "course-v1:edX+DemoX+2026_T1");
        assert_eq!(key.to_string().parse::<CourseKey>().unwrap(), key);
    }

    #[test]
    fn parse_rejects_wrong_prefix() {
        assert!("block-v1:a+b+c".parse::<CourseKey>().is_err());
    }

    #[test]
    fn parse_rejects_wrong_arity() {
        assert!("course-v1:a+b".parse::<CourseKey>().is_err());
        assert!("course-v1:a+b+c+d".parse::<CourseKey>().is_err());
    }

    #[test]
    fn invalid_component_rejected() {
        assert!(CourseKey::new("ed X", "DemoX", "2026").is_err());
    }
}
