//! Content-addressed pin identity
//!
//! A pin's identity is derived from its URL, not stored alongside it. Two URLs
//! that differ only in `http://` vs `https://` name the same resource: a link
//! saved before and after an http→https redirect must not produce two pins.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Token that replaces a leading `http://` or `https://`
const SCHEME_AGNOSTIC: &str = "https?://";

fn scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://").expect("Invalid regex"))
}

/// Rewrite a leading `http://`/`https://` to a scheme-agnostic token
///
/// # Examples
///
/// ```
/// use stacks_core::identity::normalize_url;
///
/// assert_eq!(normalize_url("http://a.com/x"), normalize_url("https://a.com/x"));
/// assert_eq!(normalize_url("ftp://a.com/x"), "ftp://a.com/x");
/// ```
#[must_use]
pub fn normalize_url(url: &str) -> String {
    scheme_regex()
        .replace(url, SCHEME_AGNOSTIC)
        .into_owned()
}

/// Identity of a pin: hex SHA-1 of its normalized URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(String);

impl PinId {
    /// Derive the identity for a URL
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let digest = Sha1::digest(normalize_url(url).as_bytes());
        Self(hex::encode(digest))
    }

    /// Get the hex representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PinId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let is_sha1_hex = s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit());
        if is_sha1_hex {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(crate::Error::ParseFailure(format!("invalid pin id: {s}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_scheme_variants() {
        assert_eq!(normalize_url("http://a.com/x"), "https?://a.com/x");
        assert_eq!(normalize_url("https://a.com/x"), "https?://a.com/x");
    }

    #[test]
    fn test_normalize_url_only_rewrites_prefix() {
        assert_eq!(
            normalize_url("https://a.com/?next=http://b.com"),
            "https?://a.com/?next=http://b.com"
        );
        assert_eq!(normalize_url("a.com/http://x"), "a.com/http://x");
    }

    #[test]
    fn test_pin_id_matches_across_schemes() {
        assert_eq!(
            PinId::from_url("http://a.com/x"),
            PinId::from_url("https://a.com/x")
        );
    }

    #[test]
    fn test_pin_id_differs_for_different_urls() {
        assert_ne!(
            PinId::from_url("https://a.com/x"),
            PinId::from_url("https://a.com/y")
        );
    }

    #[test]
    fn test_pin_id_is_sha1_of_normalized_url() {
        let id = PinId::from_url("https://a.com");
        assert_eq!(id.as_str().len(), 40);
        assert_eq!(id, PinId::from_url("http://a.com"));
        let parsed: PinId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_pin_id_parse_rejects_garbage() {
        assert!("not-a-sha".parse::<PinId>().is_err());
    }
}
