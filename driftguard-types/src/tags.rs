//! Tag sets and tag precedence.
//!
//! Three sources feed the tags of a managed entity:
//! - **default** tags, configured once per provider and applied everywhere
//! - **declared** tags, configured on the entity itself
//! - **remote** tags, whatever the control plane reports on read
//!
//! Declared tags override default tags on key collision; the result is the
//! *effective* set sent upstream. On read, default and ignored keys are
//! stripped so the caller only sees the tags it is responsible for
//! declaring (the *exposed* view), while the *all* view keeps every
//! non-ignored remote tag for display.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

/// A mapping from tag key to tag value. Keys are unique, order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a tag, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Returns the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns `self` overlaid with `other`; `other` wins on collision.
    pub fn merge(&self, other: &TagSet) -> TagSet {
        let mut merged = self.clone();
        merged
            .0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Keeps only the tags for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    /// Returns the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for TagSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl IntoIterator for TagSet {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Tag keys the engine never shows to the caller and never writes upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreTagsConfig {
    /// Exact keys to ignore.
    pub keys: BTreeSet<String>,
    /// Key prefixes to ignore.
    pub key_prefixes: Vec<String>,
    /// Prefixes reserved by the control plane itself (e.g. `aws:`).
    pub system_prefixes: Vec<String>,
}

impl Default for IgnoreTagsConfig {
    fn default() -> Self {
        Self {
            keys: BTreeSet::new(),
            key_prefixes: Vec::new(),
            system_prefixes: vec!["aws:".to_string()],
        }
    }
}

impl IgnoreTagsConfig {
    /// Returns whether `key` matches any ignore pattern.
    pub fn ignores(&self, key: &str) -> bool {
        self.keys.contains(key)
            || self.key_prefixes.iter().any(|p| key.starts_with(p.as_str()))
            || self.system_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

/// How default tags are removed from the exposed view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultTagRemoval {
    /// Any key present in the default tags is removed, whatever its value.
    /// A declared override of a default key is therefore not shown back.
    #[default]
    ByKey,
    /// A key is removed only when the remote value equals the default value.
    MatchingValue,
}

/// Union of default and declared tags; declared wins on key collision.
pub fn effective_tags(default: &TagSet, declared: &TagSet) -> TagSet {
    default.merge(declared)
}

/// Remote tags with default keys and ignored keys removed.
pub fn exposed_tags(remote: &TagSet, default: &TagSet, ignore: &IgnoreTagsConfig) -> TagSet {
    TagPolicy {
        default_tags: default.clone(),
        ignore: ignore.clone(),
        removal: DefaultTagRemoval::ByKey,
    }
    .views(remote)
    .exposed
}

/// The two tag views reported back to the caller after a read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagViews {
    /// Tags the caller is responsible for declaring.
    pub exposed: TagSet,
    /// Every non-ignored remote tag, defaults included.
    pub all: TagSet,
}

/// Changes needed to move an entity's remote tags from one set to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Tags to add or overwrite.
    pub upsert: TagSet,
    /// Keys to remove.
    pub remove: Vec<String>,
}

impl TagDelta {
    /// Computes the delta from `old` to `new`.
    pub fn between(old: &TagSet, new: &TagSet) -> Self {
        let remove = old
            .keys()
            .filter(|k| !new.contains_key(k))
            .map(str::to_owned)
            .collect();
        let upsert = new
            .iter()
            .filter(|(k, v)| old.get(k) != Some(*v))
            .collect();
        Self { upsert, remove }
    }

    /// Returns whether nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove.is_empty()
    }
}

/// Provider-level tag settings applied to every managed entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagPolicy {
    /// Tags applied to every entity.
    pub default_tags: TagSet,
    /// Keys hidden from the caller and never written.
    pub ignore: IgnoreTagsConfig,
    /// Removal rule for default tags in the exposed view.
    pub removal: DefaultTagRemoval,
}

impl TagPolicy {
    /// Effective tags for an entity declaring `declared`.
    pub fn effective(&self, declared: &TagSet) -> TagSet {
        effective_tags(&self.default_tags, declared)
    }

    /// Splits remote tags into the exposed and all views.
    pub fn views(&self, remote: &TagSet) -> TagViews {
        let mut all = remote.clone();
        all.retain(|k, _| !self.ignore.ignores(k));

        let mut exposed = all.clone();
        exposed.retain(|k, v| match (self.removal, self.default_tags.get(k)) {
            (_, None) => true,
            (DefaultTagRemoval::ByKey, Some(_)) => false,
            (DefaultTagRemoval::MatchingValue, Some(default)) => default != v,
        });

        TagViews { exposed, all }
    }

    /// Delta between two effective tag sets, with ignored keys left out.
    pub fn delta(&self, old: &TagSet, new: &TagSet) -> TagDelta {
        let mut delta = TagDelta::between(old, new);
        delta.upsert.retain(|k, _| !self.ignore.ignores(k));
        delta.remove.retain(|k| !self.ignore.ignores(k));
        delta
    }
}
