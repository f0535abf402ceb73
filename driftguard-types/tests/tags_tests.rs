use driftguard_types::{
    DefaultTagRemoval, IgnoreTagsConfig, TagDelta, TagPolicy, TagSet, effective_tags,
    exposed_tags,
};
use pretty_assertions::assert_eq;

fn tags(pairs: &[(&str, &str)]) -> TagSet {
    pairs.iter().copied().collect()
}

// ── Effective tags ────────────────────────────────────────────────

#[test]
fn declared_overrides_default() {
    let default = tags(&[("env", "prod")]);
    let declared = tags(&[("env", "dev"), ("team", "geo")]);

    assert_eq!(
        effective_tags(&default, &declared),
        tags(&[("env", "dev"), ("team", "geo")])
    );
}

#[test]
fn defaults_fill_undeclared_keys() {
    let default = tags(&[("env", "prod"), ("owner", "platform")]);
    let declared = tags(&[("team", "geo")]);

    assert_eq!(
        effective_tags(&default, &declared),
        tags(&[("env", "prod"), ("owner", "platform"), ("team", "geo")])
    );
}

#[test]
fn empty_inputs_give_empty_effective() {
    assert!(effective_tags(&TagSet::new(), &TagSet::new()).is_empty());
}

// ── Exposed tags ──────────────────────────────────────────────────

#[test]
fn collision_scenario_removes_default_key() {
    let default = tags(&[("env", "prod")]);
    let declared = tags(&[("env", "dev"), ("team", "geo")]);
    let effective = effective_tags(&default, &declared);

    let exposed = exposed_tags(&effective, &default, &IgnoreTagsConfig::default());
    assert_eq!(exposed, tags(&[("team", "geo")]));
}

#[test]
fn matching_value_removal_keeps_overridden_default() {
    let policy = TagPolicy {
        default_tags: tags(&[("env", "prod")]),
        removal: DefaultTagRemoval::MatchingValue,
        ..Default::default()
    };
    let remote = tags(&[("env", "dev"), ("team", "geo")]);

    let views = policy.views(&remote);
    assert_eq!(views.exposed, tags(&[("env", "dev"), ("team", "geo")]));
}

#[test]
fn matching_value_removal_drops_equal_default() {
    let policy = TagPolicy {
        default_tags: tags(&[("env", "prod")]),
        removal: DefaultTagRemoval::MatchingValue,
        ..Default::default()
    };
    let remote = tags(&[("env", "prod"), ("team", "geo")]);

    assert_eq!(policy.views(&remote).exposed, tags(&[("team", "geo")]));
}

#[test]
fn ignored_keys_and_prefixes_removed() {
    let ignore = IgnoreTagsConfig {
        keys: ["cost-center".to_string()].into_iter().collect(),
        key_prefixes: vec!["kubernetes.io/".to_string()],
        ..Default::default()
    };
    let remote = tags(&[
        ("cost-center", "42"),
        ("kubernetes.io/cluster", "owned"),
        ("aws:cloudformation:stack-id", "x"),
        ("team", "geo"),
    ]);

    assert_eq!(
        exposed_tags(&remote, &TagSet::new(), &ignore),
        tags(&[("team", "geo")])
    );
}

#[test]
fn all_view_keeps_defaults_but_not_ignored() {
    let policy = TagPolicy {
        default_tags: tags(&[("env", "prod")]),
        ..Default::default()
    };
    let remote = tags(&[("env", "prod"), ("team", "geo"), ("aws:createdBy", "me")]);

    let views = policy.views(&remote);
    assert_eq!(views.exposed, tags(&[("team", "geo")]));
    assert_eq!(views.all, tags(&[("env", "prod"), ("team", "geo")]));
}

#[test]
fn tag_policy_deserializes_with_defaults() {
    let policy: TagPolicy =
        serde_json::from_str(r#"{"default_tags": {"env": "prod"}}"#).unwrap();
    assert_eq!(policy.default_tags, tags(&[("env", "prod")]));
    assert_eq!(policy.removal, DefaultTagRemoval::ByKey);
    assert_eq!(policy.ignore.system_prefixes, vec!["aws:".to_string()]);
}

#[test]
fn removal_rule_uses_snake_case() {
    let removal: DefaultTagRemoval = serde_json::from_str("\"matching_value\"").unwrap();
    assert_eq!(removal, DefaultTagRemoval::MatchingValue);
}

// ── Delta ─────────────────────────────────────────────────────────

#[test]
fn delta_splits_removed_and_changed() {
    let old = tags(&[("env", "prod"), ("stale", "1"), ("team", "geo")]);
    let new = tags(&[("env", "dev"), ("team", "geo"), ("fresh", "1")]);

    let delta = TagDelta::between(&old, &new);
    assert_eq!(delta.remove, vec!["stale".to_string()]);
    assert_eq!(delta.upsert, tags(&[("env", "dev"), ("fresh", "1")]));
}

#[test]
fn policy_delta_skips_ignored_keys() {
    let policy = TagPolicy::default();
    let old = tags(&[("aws:internal", "x")]);
    let new = tags(&[("aws:other", "y"), ("team", "geo")]);

    let delta = policy.delta(&old, &new);
    assert!(delta.remove.is_empty());
    assert_eq!(delta.upsert, tags(&[("team", "geo")]));
}
