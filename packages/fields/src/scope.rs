//! Field scopes and the key shape handed to the backing store.

use std::fmt;

use courseware_keys::UsageId;

/// Where a field's value lives.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    /// Authoring-time settings (display name, policy knobs). Shared by all
    /// students, editable in the authoring environment.
    Settings,
    /// The content payload itself (markup, problem definition).
    Content,
    /// Per-student state (answers, position). Keys in this scope carry the
    /// student identity.
    UserState,
}

impl Scope {
    pub fn is_user_state(&self) -> bool {
        matches!(self, Scope::UserState)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Settings => "settings",
            Scope::Content => "content",
            Scope::UserState => "user_state",
        };
        write!(f, "{}", name)
    }
}

/// The full key for one stored field value.
///
/// The backing store may be shared by many blocks and many students, so the
/// key carries the scope, the block placement, the field name, and - for
/// user-state scope - the user.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FieldKey {
    pub scope: Scope,
    pub usage: UsageId,
    pub field: String,
    pub user: Option<String>,
}

impl FieldKey {
    /// A key for a shared (settings/content) field.
    pub fn new(scope: Scope, usage: UsageId, field: impl Into<String>) -> Self {
        Self {
            scope,
            usage,
            field: field.into(),
            user: None,
        }
    }

    /// A key for a per-student field.
    pub fn for_user(
        scope: Scope,
        usage: UsageId,
        field: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            usage,
            field: field.into(),
            user: Some(user.into()),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}/{}/{}/{}", self.scope, self.usage, self.field, user),
            None => write!(f, "{}/{}/{}", self.scope, self.usage, self.field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseware_keys::CourseKey;

    fn usage() -> UsageId {
        let course = CourseKey::new("edX", "DemoX", "2026").unwrap();
        UsageId::new(course, "problem", "quiz_1").unwrap()
    }

    #[test]
    fn keys_order_and_compare() {
        let a = FieldKey::new(Scope::Settings, usage(), "display_name");
        let b = FieldKey::new(Scope::Settings, usage(), "display_name");
        assert_eq!(a, b);

        let c = FieldKey::for_user(Scope::UserState, usage(), "position", "student_1");
        assert_ne!(a, c);
        assert_eq!(c.user.as_deref(), Some("student_1"));
    }

    #[test]
    fn scope_display() {
        assert_eq!(Scope::Settings.to_string(), "settings");
        assert_eq!(Scope::UserState.to_string(), "user_state");
        assert!(Scope::UserState.is_user_state());
        assert!(!Scope::Content.is_user_state());
    }
}
