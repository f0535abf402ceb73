use driftguard_engine::{ConfigError, ConfigStore, MemoryConfigStore, ProviderConfig};
use driftguard_types::{DefaultTagRemoval, IgnoreTagsConfig};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Provider configuration ────────────────────────────────────────

#[test]
fn empty_document_takes_defaults() {
    let config = ProviderConfig::from_json("{}").unwrap();
    assert_eq!(config, ProviderConfig::default());
    assert_eq!(config.default_tag_removal, DefaultTagRemoval::ByKey);
    assert_eq!(config.ignore_tags, IgnoreTagsConfig::default());
}

#[test]
fn full_document_parses() {
    let config = ProviderConfig::from_json(
        r#"{
            "default_tags": {"env": "prod"},
            "ignore_tags": {"keys": ["LastScanned"], "key_prefixes": ["ci:"]},
            "default_tag_removal": "matching_value"
        }"#,
    )
    .unwrap();

    assert_eq!(config.default_tags.get("env"), Some("prod"));
    assert!(config.ignore_tags.ignores("LastScanned"));
    assert!(config.ignore_tags.ignores("ci:run"));
    // System prefixes keep their default when not given.
    assert!(config.ignore_tags.ignores("aws:createdBy"));
    assert_eq!(config.default_tag_removal, DefaultTagRemoval::MatchingValue);

    let policy = config.tag_policy();
    assert_eq!(policy.default_tags, config.default_tags);
    assert_eq!(policy.removal, DefaultTagRemoval::MatchingValue);
}

#[test]
fn malformed_document_is_a_parse_error() {
    let err = ProviderConfig::from_json(r#"{"default_tag_removal": "sometimes"}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn ignored_default_tag_is_invalid() {
    let err = ProviderConfig::from_json(r#"{"default_tags": {"aws:team": "geo"}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
}

#[test]
fn empty_prefix_is_invalid() {
    let err =
        ProviderConfig::from_json(r#"{"ignore_tags": {"key_prefixes": [""]}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn empty_default_tag_key_is_invalid() {
    let err = ProviderConfig::from_json(r#"{"default_tags": {"": "x"}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

// ── Memory store ──────────────────────────────────────────────────

#[test]
fn new_store_is_first_pass_without_identifier() {
    let store = MemoryConfigStore::new(json!({"name": "a"}));
    assert!(store.is_first_pass());
    assert_eq!(store.current_identifier(), None);
    assert_eq!(store.get("name"), Some(json!("a")));
    // Everything declared counts as changed on the first pass.
    assert!(store.has_changed("name"));
}

#[test]
fn commit_resets_change_tracking() {
    let mut store = MemoryConfigStore::new(json!({"name": "a"}));
    store.commit();

    assert!(!store.is_first_pass());
    assert!(!store.has_changed("name"));

    store.set("name", json!("b"));
    assert!(store.has_changed("name"));
    assert_eq!(
        store.get_change("name"),
        (Some(json!("a")), Some(json!("b")))
    );
}

#[test]
fn null_clears_a_field() {
    let mut store = MemoryConfigStore::existing("id", json!({"description": "d"}));
    store.set("description", serde_json::Value::Null);

    assert_eq!(store.get("description"), None);
    assert!(store.has_changed("description"));
    assert_eq!(store.values().len(), 0);
}

#[test]
fn empty_identifier_is_no_identifier() {
    let mut store = MemoryConfigStore::default();
    store.set_identifier(Some(String::new()));
    assert_eq!(store.current_identifier(), None);

    store.set_identifier(Some("places".into()));
    assert_eq!(store.current_identifier().as_deref(), Some("places"));
}

#[test]
fn declare_overlays_desired_values() {
    let mut store = MemoryConfigStore::existing("id", json!({"a": 1, "b": 2}));
    store.declare(json!({"b": 3}));

    assert_eq!(store.get("a"), Some(json!(1)));
    assert_eq!(store.get("b"), Some(json!(3)));
    assert!(store.has_changed("b"));
}

#[test]
fn declare_clears_fields_dropped_since_last_declaration() {
    let mut store = MemoryConfigStore::new(json!({"name": "a", "description": "d"}));
    store.set("arn", json!("arn:computed"));
    store.commit();

    store.declare(json!({"name": "a"}));

    assert_eq!(store.get("description"), None);
    assert!(store.has_changed("description"));
    assert!(!store.has_changed("name"));
    // Never declared, so never cleared.
    assert_eq!(store.get("arn"), Some(json!("arn:computed")));

    // Once dropped, it stays out of the next declaration's bookkeeping.
    store.commit();
    store.set("description", json!("observed"));
    store.declare(json!({"name": "a"}));
    assert_eq!(store.get("description"), Some(json!("observed")));
}

#[test]
fn existing_store_has_no_declaration_to_clear() {
    let mut store = MemoryConfigStore::existing("id", json!({"a": 1, "arn": "x"}));
    store.declare(json!({"a": 1}));

    assert_eq!(store.get("arn"), Some(json!("x")));
    assert!(!store.has_changed("a"));
}

#[test]
fn store_round_trips_through_serde() {
    let store = MemoryConfigStore::existing("web:80:sticky", json!({"lb_port": 80}));
    let text = serde_json::to_string(&store).unwrap();
    let back: MemoryConfigStore = serde_json::from_str(&text).unwrap();
    assert_eq!(back, store);
}
