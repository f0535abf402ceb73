//! Identifier types used to address remote entities across passes.
//!
//! An identifier is either a single natural key (the entity's name) or a
//! composite of several natural keys joined by [`DELIMITER`]. The joined form
//! is what gets persisted, so it must stay stable; internally composites are
//! fixed-arity tuples so "decode yields exactly N parts" is checked by the
//! type rather than by convention.
//!
//! No escaping is performed. A component that contains the delimiter makes
//! decoding ambiguous; only the last component may legally contain it,
//! because decoding uses a bounded split.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between composite identifier components.
pub const DELIMITER: char = ':';

/// Errors raised while decoding a persisted identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Fewer components than the identifier type requires.
    #[error("malformed identifier {id:?}: expected {expected} components separated by ':', found {found}")]
    WrongArity {
        id: String,
        expected: usize,
        found: usize,
    },

    /// A component could not be interpreted.
    #[error("malformed identifier {id:?}: component {position} {reason}")]
    InvalidComponent {
        id: String,
        position: usize,
        reason: String,
    },

    /// The identifier is empty.
    #[error("malformed identifier: empty")]
    Empty,
}

/// Joins components with [`DELIMITER`] in the order given.
pub fn encode_components<S: AsRef<str>>(components: &[S]) -> String {
    let mut out = String::new();
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(component.as_ref());
    }
    out
}

/// Splits `id` into exactly `N` components.
///
/// The split is bounded: everything after the `N-1`th delimiter belongs to
/// the last component.
pub fn decode_components<const N: usize>(id: &str) -> Result<[String; N], IdentifierError> {
    let parts: Vec<String> = id.splitn(N, DELIMITER).map(str::to_owned).collect();
    let found = parts.len();
    parts.try_into().map_err(|_| IdentifierError::WrongArity {
        id: id.to_owned(),
        expected: N,
        found,
    })
}

/// An identifier the engine can persist and later decode back.
pub trait EntityIdentifier: Sized {
    /// Number of components in the encoded form.
    const ARITY: usize;

    /// Encodes the identifier into its persisted string form.
    fn encode(&self) -> String;

    /// Decodes a persisted identifier.
    fn decode(id: &str) -> Result<Self, IdentifierError>;
}

/// Identifier that is the entity's own name; encode and decode are identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    /// Creates a natural key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EntityIdentifier for NaturalKey {
    const ARITY: usize = 1;

    fn encode(&self) -> String {
        self.0.clone()
    }

    fn decode(id: &str) -> Result<Self, IdentifierError> {
        if id.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(Self(id.to_owned()))
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positional identifier made of exactly `N` components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId<const N: usize>([String; N]);

impl<const N: usize> CompositeId<N> {
    /// Creates a composite identifier from its components, in order.
    pub fn new(components: [String; N]) -> Self {
        Self(components)
    }

    /// Returns the components in order.
    pub fn components(&self) -> &[String; N] {
        &self.0
    }

    /// Consumes the identifier, returning its components.
    pub fn into_components(self) -> [String; N] {
        self.0
    }
}

impl<const N: usize> EntityIdentifier for CompositeId<N> {
    const ARITY: usize = N;

    fn encode(&self) -> String {
        encode_components(&self.0)
    }

    fn decode(id: &str) -> Result<Self, IdentifierError> {
        if id.is_empty() {
            return Err(IdentifierError::Empty);
        }
        decode_components::<N>(id).map(Self)
    }
}

impl<const N: usize> fmt::Display for CompositeId<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Identifier of a policy bound to a load balancer listener:
/// `<load balancer>:<port>:<policy name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerPolicyId {
    /// Name of the owning load balancer.
    pub load_balancer: String,
    /// Listener port on the load balancer.
    pub port: u16,
    /// Name of the policy.
    pub policy_name: String,
}

impl ListenerPolicyId {
    /// Creates a listener policy identifier.
    pub fn new(load_balancer: impl Into<String>, port: u16, policy_name: impl Into<String>) -> Self {
        Self {
            load_balancer: load_balancer.into(),
            port,
            policy_name: policy_name.into(),
        }
    }
}

impl EntityIdentifier for ListenerPolicyId {
    const ARITY: usize = 3;

    fn encode(&self) -> String {
        let port = self.port.to_string();
        encode_components(&[
            self.load_balancer.as_str(),
            port.as_str(),
            self.policy_name.as_str(),
        ])
    }

    fn decode(id: &str) -> Result<Self, IdentifierError> {
        let [load_balancer, port, policy_name] = CompositeId::<3>::decode(id)?.into_components();
        let port = port
            .parse::<u16>()
            .map_err(|e| IdentifierError::InvalidComponent {
                id: id.to_owned(),
                position: 1,
                reason: format!("is not a valid port: {e}"),
            })?;
        Ok(Self {
            load_balancer,
            port,
            policy_name,
        })
    }
}

impl fmt::Display for ListenerPolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ListenerPolicyId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_split_keeps_trailing_delimiters() {
        let [a, b] = decode_components::<2>("x:y:z").unwrap();
        assert_eq!(a, "x");
        assert_eq!(b, "y:z");
    }

    #[test]
    fn arity_reported_on_short_input() {
        let err = decode_components::<3>("x:y").unwrap_err();
        assert_eq!(
            err,
            IdentifierError::WrongArity {
                id: "x:y".into(),
                expected: 3,
                found: 2,
            }
        );
    }
}
