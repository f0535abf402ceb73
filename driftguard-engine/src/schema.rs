//! Field declarations and typed field readers.
//!
//! Each entity kind declares its fields once, with presence and force-new
//! markers. The reconciler uses the declarations to decide which changes can
//! be applied in place; kinds use the readers below to build their typed
//! configuration from a [`ConfigStore`] and reject bad input at load time.

use crate::store::ConfigStore;
use driftguard_types::TagSet;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Declared tags of an entity.
pub const TAGS: &str = "tags";
/// Every non-ignored tag on the remote entity.
pub const TAGS_ALL: &str = "tags_all";

/// Who supplies a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be declared.
    Required,
    /// May be declared.
    Optional,
    /// Only ever written by the engine from remote state.
    Computed,
    /// May be declared; filled from remote state when not.
    OptionalComputed,
}

/// A declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub presence: Presence,
    /// A change requires replacing the entity.
    pub force_new: bool,
}

impl Field {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            presence: Presence::Required,
            force_new: false,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            presence: Presence::Optional,
            force_new: false,
        }
    }

    pub const fn computed(name: &'static str) -> Self {
        Self {
            name,
            presence: Presence::Computed,
            force_new: false,
        }
    }

    pub const fn optional_computed(name: &'static str) -> Self {
        Self {
            name,
            presence: Presence::OptionalComputed,
            force_new: false,
        }
    }

    /// Marks the field as creation-only.
    pub const fn force_new(self) -> Self {
        Self {
            force_new: true,
            ..self
        }
    }

    /// Whether the caller can declare this field.
    pub fn is_declarable(&self) -> bool {
        self.presence != Presence::Computed
    }

    /// Whether a change to this field is applied by the main update call.
    /// Tags are excluded; they have their own call.
    pub fn is_updatable(&self) -> bool {
        self.is_declarable() && !self.force_new && self.name != TAGS
    }
}

/// Force-new fields that changed since the last pass.
pub fn changed_force_new(schema: &[Field], store: &dyn ConfigStore) -> Option<&'static str> {
    schema
        .iter()
        .filter(|f| f.force_new && f.is_declarable())
        .map(|f| f.name)
        .find(|name| store.has_changed(name))
}

/// In-place updatable fields that changed since the last pass.
///
/// An optional-computed field that is no longer declared keeps whatever the
/// remote side holds, so its absence is not a change.
pub fn changed_updatable(schema: &[Field], store: &dyn ConfigStore) -> Vec<&'static str> {
    schema
        .iter()
        .filter(|f| f.is_updatable())
        .filter(|f| f.presence != Presence::OptionalComputed || store.get(f.name).is_some())
        .map(|f| f.name)
        .filter(|name| store.has_changed(name))
        .collect()
}

/// A field failed to load or validate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Reads a required string field.
pub fn required_string(store: &dyn ConfigStore, field: &'static str) -> Result<String, FieldError> {
    optional_string(store, field)?.ok_or_else(|| FieldError::new(field, "is required"))
}

/// Reads an optional string field. An empty string counts as absent.
pub fn optional_string(
    store: &dyn ConfigStore,
    field: &'static str,
) -> Result<Option<String>, FieldError> {
    match store.get(field) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(FieldError::new(field, format!("expected a string, got {other}"))),
    }
}

/// Reads a required TCP port.
pub fn required_port(store: &dyn ConfigStore, field: &'static str) -> Result<u16, FieldError> {
    let value = store
        .get(field)
        .ok_or_else(|| FieldError::new(field, "is required"))?;
    value
        .as_u64()
        .and_then(|n| u16::try_from(n).ok())
        .filter(|port| *port > 0)
        .ok_or_else(|| FieldError::new(field, format!("expected a port number, got {value}")))
}

/// Reads an optional structured field.
pub fn optional_object<T: DeserializeOwned>(
    store: &dyn ConfigStore,
    field: &'static str,
) -> Result<Option<T>, FieldError> {
    store
        .get(field)
        .map(|value| serde_json::from_value(value).map_err(|e| FieldError::new(field, e.to_string())))
        .transpose()
}

/// Reads a tag map; absent means empty.
pub fn tag_set(store: &dyn ConfigStore, field: &'static str) -> Result<TagSet, FieldError> {
    Ok(optional_object(store, field)?.unwrap_or_default())
}

/// Checks a string's length in characters.
pub fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), FieldError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(FieldError::new(
            field,
            format!("length must be between {min} and {max}, got {len}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConfigStore;
    use serde_json::json;

    const SCHEMA: &[Field] = &[
        Field::required("name").force_new(),
        Field::optional("description"),
        Field::optional(TAGS),
        Field::computed("arn"),
    ];

    #[test]
    fn updatable_excludes_force_new_tags_and_computed() {
        let names: Vec<_> = SCHEMA
            .iter()
            .filter(|f| f.is_updatable())
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["description"]);
    }

    #[test]
    fn changed_fields_detected() {
        let mut store = MemoryConfigStore::existing("x", json!({"name": "a", "description": "d"}));
        store.set("description", json!("e"));
        store.set("arn", json!("arn:x"));
        assert_eq!(changed_updatable(SCHEMA, &store), vec!["description"]);
        assert_eq!(changed_force_new(SCHEMA, &store), None);

        store.set("name", json!("b"));
        assert_eq!(changed_force_new(SCHEMA, &store), Some("name"));
    }

    #[test]
    fn undeclared_optional_computed_is_not_a_change() {
        const COMPUTED: &[Field] = &[Field::optional_computed("mode")];
        let mut store = MemoryConfigStore::existing("x", json!({"mode": "fast"}));

        store.set("mode", Value::Null);
        assert!(changed_updatable(COMPUTED, &store).is_empty());

        store.set("mode", json!("slow"));
        assert_eq!(changed_updatable(COMPUTED, &store), vec!["mode"]);
    }

    #[test]
    fn port_validation() {
        let store = MemoryConfigStore::new(json!({"a": 80, "b": 0, "c": 70000, "d": "80"}));
        assert_eq!(required_port(&store, "a"), Ok(80));
        assert!(required_port(&store, "b").is_err());
        assert!(required_port(&store, "c").is_err());
        assert!(required_port(&store, "d").is_err());
        assert!(required_port(&store, "missing").is_err());
    }

    #[test]
    fn empty_string_is_absent() {
        let store = MemoryConfigStore::new(json!({"s": ""}));
        assert_eq!(optional_string(&store, "s"), Ok(None));
        assert!(required_string(&store, "s").is_err());
    }
}
