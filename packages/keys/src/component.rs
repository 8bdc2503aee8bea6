//! Validation for the components that make up serialized keys.

use crate::error::KeyError;

/// Characters that delimit components in the serialized key forms.
const RESERVED: &[char] = &['+', ':', '@', '/'];

/// Validate a single key component.
///
/// Components must be non-empty and must not contain any of the delimiter
/// characters used by the serialized forms, so that every key string parses
/// back unambiguously.
pub(crate) fn validate(component: &str) -> Result<(), KeyError> {
    if component.is_empty() {
        return Err(KeyError::InvalidComponent {
            component: component.to_string(),
            message: "empty component".to_string(),
        });
    }

    if let Some(c) = component.chars().find(|c| RESERVED.contains(c) || c.is_whitespace()) {
        return Err(KeyError::InvalidComponent {
            component: component.to_string(),
            message: format!("reserved character '{}'", c),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_components_accepted() {
        assert!(validate("edX").is_ok());
        assert!(validate("problem_1").is_ok());
        assert!(validate("2026-spring").is_ok());
    }

    #[test]
    fn empty_component_rejected() {
        assert!(validate("").is_err());
    }

    #[test]
    fn reserved_characters_rejected() {
        for bad in ["a+b", "a:b", "a@b", "a/b", "a b"] {
            assert!(validate(bad).is_err(), "expected '{}' to be rejected", bad);
        }
    }
}
