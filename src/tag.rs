//! Validated exercise tags
//!
//! Tags identify exercises, flags and categories across the platform.
//! A tag starts and ends with a lowercase letter or digit, may carry
//! hyphens in between, and is at least two characters long.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("tag pattern is valid"));

/// Identifier of an exercise, flag or category.
///
/// Construction through [`Tag::new`] or [`FromStr`] validates the
/// pattern. Deserialization is unchecked, mirroring how catalog records
/// arrive off the wire; the registry re-validates at its boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Create a validated tag.
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        if !TAG_PATTERN.is_match(&tag) {
            return Err(Error::UnknownTag(tag));
        }
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Tag::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_tags() {
        assert!(Tag::new("abc-123").is_ok());
        assert!(Tag::new("ab").is_ok());
        assert!(Tag::new("sql-injection").is_ok());
        assert!(Tag::new("x0").is_ok());
    }

    #[test]
    fn test_rejects_invalid_tags() {
        for bad in ["a", "-abc", "abc-", "ABC", "", "a_b", "a b"] {
            let result = Tag::new(bad);
            assert!(
                matches!(result, Err(Error::UnknownTag(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_from_str_validates() {
        assert!("ftp".parse::<Tag>().is_ok());
        assert!("-ftp".parse::<Tag>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let tag = Tag::new("heartbleed").unwrap();
        assert_eq!(tag.to_string(), "heartbleed");
        assert_eq!(tag.as_str(), "heartbleed");
    }

    #[test]
    fn test_deserialization_is_unchecked() {
        // Wire records carry raw strings; validation happens at registration.
        let tag: Tag = serde_json::from_str("\"NOT-VALID\"").unwrap();
        assert_eq!(tag.as_str(), "NOT-VALID");
        assert!(Tag::new(tag.as_str()).is_err());
    }
}
