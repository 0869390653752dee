//! Component interaction key codec
//!
//! Component interactions are counted under the composite key
//! `<app slug>:<component type>`. Neither part may contain the delimiter, so
//! decoding is unambiguous.
//!
//! Examples:
//! - `acme-ci:issue-link`
//! - `acme-ci:stacktrace-link`

use thiserror::Error;

pub const DELIMITER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyCodecError {
    #[error("{part} must not be empty")]
    Empty { part: &'static str },

    #[error("{part} '{value}' must not contain ':'")]
    ContainsDelimiter { part: &'static str, value: String },

    #[error("'{0}' is not a component interaction key")]
    Malformed(String),
}

/// Decoded `<slug>:<component type>` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentInteractionKey {
    slug: String,
    component_type: String,
}

impl ComponentInteractionKey {
    pub fn new(slug: &str, component_type: &str) -> Result<Self, KeyCodecError> {
        check_part("slug", slug)?;
        check_part("component type", component_type)?;
        Ok(ComponentInteractionKey {
            slug: slug.to_string(),
            component_type: component_type.to_string(),
        })
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", self.slug, DELIMITER, self.component_type)
    }

    pub fn decode(key: &str) -> Result<Self, KeyCodecError> {
        let (slug, component_type) = key
            .split_once(DELIMITER)
            .ok_or_else(|| KeyCodecError::Malformed(key.to_string()))?;
        if component_type.contains(DELIMITER) {
            return Err(KeyCodecError::Malformed(key.to_string()));
        }
        Self::new(slug, component_type)
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }
}

fn check_part(part: &'static str, value: &str) -> Result<(), KeyCodecError> {
    if value.is_empty() {
        return Err(KeyCodecError::Empty { part });
    }
    if value.contains(DELIMITER) {
        return Err(KeyCodecError::ContainsDelimiter {
            part,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let key = ComponentInteractionKey::new("acme-ci", "issue-link").unwrap();
        assert_eq!(key.encode(), "acme-ci:issue-link");
    }

    #[test]
    fn test_decode() {
        let key = ComponentInteractionKey::decode("acme-ci:stacktrace-link").unwrap();
        assert_eq!(key.slug(), "acme-ci");
        assert_eq!(key.component_type(), "stacktrace-link");
    }

    #[test]
    fn test_rejects_delimiter_in_parts() {
        assert_eq!(
            ComponentInteractionKey::new("acme:ci", "issue-link"),
            Err(KeyCodecError::ContainsDelimiter {
                part: "slug",
                value: "acme:ci".to_string()
            })
        );
        assert!(matches!(
            ComponentInteractionKey::new("acme", "issue:link"),
            Err(KeyCodecError::ContainsDelimiter { part: "component type", .. })
        ));
    }

    #[test]
    fn test_rejects_empty_parts() {
        assert_eq!(
            ComponentInteractionKey::new("", "issue-link"),
            Err(KeyCodecError::Empty { part: "slug" })
        );
        assert!(ComponentInteractionKey::decode("acme:").is_err());
        assert!(ComponentInteractionKey::decode(":issue-link").is_err());
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(
            ComponentInteractionKey::decode("acme"),
            Err(KeyCodecError::Malformed("acme".to_string()))
        );
        assert_eq!(
            ComponentInteractionKey::decode("a:b:c"),
            Err(KeyCodecError::Malformed("a:b:c".to_string()))
        );
    }

    #[test]
    fn test_error_message() {
        let err = ComponentInteractionKey::new("a:b", "issue-link").unwrap_err();
        assert_eq!(err.to_string(), "slug 'a:b' must not contain ':'");
    }
}
