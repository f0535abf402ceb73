//! Configuration store contract.
//!
//! The engine never persists anything itself. Desired configuration comes in
//! through a [`ConfigStore`], observed state and the entity identifier go
//! back out through it, and only what the store keeps survives between
//! passes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Typed configuration record for one entity.
///
/// A field holding `Value::Null` is treated as absent.
pub trait ConfigStore: Send + Sync {
    /// Current value of a field.
    fn get(&self, field: &str) -> Option<Value>;

    /// Writes a field. `Value::Null` clears it.
    fn set(&mut self, field: &str, value: Value);

    /// Whether the field differs from the value recorded at the last pass.
    fn has_changed(&self, field: &str) -> bool;

    /// `(previous, current)` values of a field.
    fn get_change(&self, field: &str) -> (Option<Value>, Option<Value>);

    /// Records the entity identifier; `None` marks the entity absent.
    fn set_identifier(&mut self, id: Option<String>);

    /// The recorded identifier.
    fn current_identifier(&self) -> Option<String>;

    /// Whether this pass is the one that created the entity.
    fn is_first_pass(&self) -> bool;
}

/// [`ConfigStore`] kept in memory, with a snapshot of the previous pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfigStore {
    prior: Map<String, Value>,
    current: Map<String, Value>,
    identifier: Option<String>,
    first_pass: bool,
    /// Fields named by the latest declaration.
    #[serde(default)]
    declared: BTreeSet<String>,
}

impl MemoryConfigStore {
    /// Store for an entity that does not exist yet, declared by a JSON object.
    /// Non-object values declare nothing.
    pub fn new(desired: Value) -> Self {
        let current = match desired {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            prior: Map::new(),
            declared: current.keys().cloned().collect(),
            current,
            identifier: None,
            first_pass: true,
        }
    }

    /// Store for an entity tracked by an earlier pass under `id`.
    ///
    /// `recorded` is observed state, not a declaration: the next
    /// [`declare`](Self::declare) clears none of it.
    pub fn existing(id: impl Into<String>, recorded: Value) -> Self {
        let mut store = Self::new(recorded);
        store.identifier = Some(id.into());
        store.declared.clear();
        store.commit();
        store
    }

    /// Ends a pass: the current values become the baseline for change
    /// detection and the next pass is no longer the first.
    pub fn commit(&mut self) {
        self.prior = self.current.clone();
        self.first_pass = false;
    }

    /// Starts a pass: overlays the desired configuration on the values the
    /// last pass observed.
    ///
    /// A field the previous declaration named but this one does not is
    /// cleared, so its removal shows up as a change. Fields only ever
    /// written from remote state are left alone.
    pub fn declare(&mut self, desired: Value) {
        let map = match desired {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let dropped: Vec<String> = self
            .declared
            .iter()
            .filter(|field| !map.contains_key(field.as_str()))
            .cloned()
            .collect();
        for field in dropped {
            self.current.remove(&field);
        }

        self.declared = map.keys().cloned().collect();
        for (field, value) in map {
            self.set(&field, value);
        }
    }

    /// All current values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.current
    }
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, field: &str) -> Option<Value> {
        present(self.current.get(field))
    }

    fn set(&mut self, field: &str, value: Value) {
        if value.is_null() {
            self.current.remove(field);
        } else {
            self.current.insert(field.to_string(), value);
        }
    }

    fn has_changed(&self, field: &str) -> bool {
        present(self.prior.get(field)) != present(self.current.get(field))
    }

    fn get_change(&self, field: &str) -> (Option<Value>, Option<Value>) {
        (
            present(self.prior.get(field)),
            present(self.current.get(field)),
        )
    }

    fn set_identifier(&mut self, id: Option<String>) {
        self.identifier = id.filter(|id| !id.is_empty());
    }

    fn current_identifier(&self) -> Option<String> {
        self.identifier.clone()
    }

    fn is_first_pass(&self) -> bool {
        self.first_pass
    }
}
