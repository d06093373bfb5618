//! Immutable tag sets threaded through the component tree.
//!
//! Tags are never mutated after a component receives them. A child derives
//! its own set by merging over the parent's, with the child's value winning
//! on key collision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{TAG_ENVIRONMENT, TAG_SERVICE};

/// Ordered key/value tag mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns a copy of this set with one tag added or replaced.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.0.insert(key.into(), value.into());
        self
    }

    /// Merges `child` over `self`; the child's value wins on collision.
    #[must_use]
    pub fn merge(&self, child: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(child.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Looks up a tag value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both mandatory tags (`Environment`, `Service`) are present.
    #[must_use]
    pub fn has_mandatory(&self) -> bool {
        self.contains_key(TAG_ENVIRONMENT) && self.contains_key(TAG_SERVICE)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
