//! Tag set model

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// An insertion-ordered set of tags
///
/// Order is kept for presentation only: two tag sets are equal when they hold
/// the same tags, regardless of order. This keeps tag union commutative and
/// associative while still showing tags in first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    /// Create an empty tag set
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a tag, ignoring duplicates and blank names
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    /// Check whether a tag is present
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|existing| existing == tag)
    }

    /// First-seen ordered union of `self` followed by `other`
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        self.iter().chain(other.iter()).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags as a slice, in first-seen order
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl PartialEq for Tags {
    fn eq(&self, other: &Self) -> bool {
        let ours: HashSet<&String> = self.0.iter().collect();
        let theirs: HashSet<&String> = other.0.iter().collect();
        ours == theirs
    }
}

impl Eq for Tags {}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

impl From<Vec<String>> for Tags {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(value: Tags) -> Self {
        value.0
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_dedup_keeps_first_seen_order() {
        let tags: Tags = ["b", "a", "b", "c", "a"].into_iter().collect();
        assert_eq!(tags.as_slice(), ["b", "a", "c"]);
    }

    #[test]
    fn test_tags_ignore_blank() {
        let tags: Tags = ["", "  ", "x"].into_iter().collect();
        assert_eq!(tags.as_slice(), ["x"]);
    }

    #[test]
    fn test_tags_union_order() {
        let x: Tags = ["a", "b"].into_iter().collect();
        let y: Tags = ["c", "a", "d"].into_iter().collect();
        assert_eq!(x.union(&y).as_slice(), ["a", "b", "c", "d"]);
        assert_eq!(y.union(&x).as_slice(), ["c", "a", "d", "b"]);
    }

    #[test]
    fn test_tags_equality_ignores_order() {
        let x: Tags = ["a", "b"].into_iter().collect();
        let y: Tags = ["b", "a"].into_iter().collect();
        let z: Tags = ["a"].into_iter().collect();
        assert_eq!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn test_tags_serialize_as_array() {
        let tags: Tags = ["x", "y"].into_iter().collect();
        assert_eq!(serde_json::to_string(&tags).unwrap(), r#"["x","y"]"#);
        let parsed: Tags = serde_json::from_str(r#"["x","x","y"]"#).unwrap();
        assert_eq!(parsed.as_slice(), ["x", "y"]);
    }
}
