//! Property-based tests for the identifier codec and tag merge rules.
//!
//! - Decoding an encoded composite returns the original components
//! - Exposing effective tags gives back the declared tags when nothing is
//!   ignored and no key collides with a default
//! - The exposed view is always contained in the all view

use driftguard_types::{
    CompositeId, EntityIdentifier, IgnoreTagsConfig, ListenerPolicyId, TagDelta, TagPolicy,
    TagSet, decode_components, effective_tags, encode_components, exposed_tags,
};
use proptest::prelude::*;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn component_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9_.-]{0,24}").unwrap()
}

fn tag_set_strategy(prefix: &'static str) -> impl Strategy<Value = TagSet> {
    prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8).prop_map(move |map| {
        map.into_iter()
            .map(|(k, v)| (format!("{prefix}{k}"), v))
            .collect()
    })
}

fn no_ignores() -> IgnoreTagsConfig {
    IgnoreTagsConfig {
        system_prefixes: Vec::new(),
        ..Default::default()
    }
}

// =============================================================================
// IDENTIFIER PROPERTIES
// =============================================================================

proptest! {
    /// Decode(Encode(a, b, c)) == (a, b, c)
    #[test]
    fn composite_roundtrip(
        a in component_strategy(),
        b in component_strategy(),
        c in component_strategy(),
    ) {
        let encoded = encode_components(&[a.as_str(), b.as_str(), c.as_str()]);
        let decoded = decode_components::<3>(&encoded).unwrap();
        prop_assert_eq!(decoded, [a, b, c]);
    }

    /// Typed composite identifiers survive a round trip through their wire form.
    #[test]
    fn listener_policy_roundtrip(
        lb in "[A-Za-z0-9-]{1,32}",
        port in 1u16..,
        policy in "[A-Za-z0-9-]{1,32}",
    ) {
        let id = ListenerPolicyId::new(lb, port, policy);
        prop_assert_eq!(ListenerPolicyId::decode(&id.encode()).unwrap(), id);
    }

    /// Generic composites of any arity round trip when non-empty.
    #[test]
    fn composite_id_roundtrip(
        a in "[a-z]{1,8}",
        b in component_strategy(),
        c in component_strategy(),
        d in component_strategy(),
    ) {
        let id = CompositeId::new([a, b, c, d]);
        prop_assert_eq!(CompositeId::<4>::decode(&id.encode()).unwrap(), id);
    }
}

// =============================================================================
// TAG PROPERTIES
// =============================================================================

proptest! {
    /// ExposedTags(EffectiveTags(D, T), D, []) == T when T and D share no keys.
    #[test]
    fn exposed_of_effective_is_declared(
        default in tag_set_strategy("d-"),
        declared in tag_set_strategy("t-"),
    ) {
        let effective = effective_tags(&default, &declared);
        prop_assert_eq!(exposed_tags(&effective, &default, &no_ignores()), declared);
    }

    /// Every declared tag is effective with its declared value.
    #[test]
    fn declared_always_wins(
        default in tag_set_strategy(""),
        declared in tag_set_strategy(""),
    ) {
        let effective = effective_tags(&default, &declared);
        for (k, v) in declared.iter() {
            prop_assert_eq!(effective.get(k), Some(v));
        }
        for k in effective.keys() {
            prop_assert!(default.contains_key(k) || declared.contains_key(k));
        }
    }

    /// exposed ⊆ all, and no default key ever appears in exposed.
    #[test]
    fn exposed_within_all(
        default in tag_set_strategy(""),
        remote in tag_set_strategy(""),
    ) {
        let policy = TagPolicy { default_tags: default.clone(), ..Default::default() };
        let views = policy.views(&remote);
        for (k, v) in views.exposed.iter() {
            prop_assert_eq!(views.all.get(k), Some(v));
            prop_assert!(!default.contains_key(k));
        }
    }

    /// Applying a delta to the old set yields the new set.
    #[test]
    fn delta_applies_cleanly(
        old in tag_set_strategy(""),
        new in tag_set_strategy(""),
    ) {
        let delta = TagDelta::between(&old, &new);
        let mut applied = old.clone();
        for key in &delta.remove {
            applied.remove(key);
        }
        let applied = applied.merge(&delta.upsert);
        prop_assert_eq!(applied, new);
    }
}
