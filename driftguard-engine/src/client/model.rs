//! Requests and observations exchanged with the control plane, typed by
//! entity kind.

use chrono::{DateTime, Utc};
use driftguard_types::TagSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pricing plan the place index update call requires on every request.
pub const PRICING_PLAN_REQUEST_BASED_USAGE: &str = "RequestBasedUsage";

/// Kinds of remote entity the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Application-cookie stickiness policy on a classic load balancer.
    AppCookieStickinessPolicy,
    /// Geocoding place index.
    PlaceIndex,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppCookieStickinessPolicy => f.write_str("app cookie stickiness policy"),
            Self::PlaceIndex => f.write_str("place index"),
        }
    }
}

/// How the control plane addresses an existing entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity kind.
    pub kind: EntityType,
    /// Owning resource, for entities scoped under another one.
    pub owner: Option<String>,
    /// Entity name, unique within its owner.
    pub name: String,
}

impl EntityRef {
    /// Reference to a top-level entity.
    pub fn top_level(kind: EntityType, name: impl Into<String>) -> Self {
        Self {
            kind,
            owner: None,
            name: name.into(),
        }
    }

    /// Reference to an entity owned by another resource.
    pub fn owned(kind: EntityType, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            owner: Some(owner.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{} {owner}/{}", self.kind, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Intended use of geocoding results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntendedUse {
    /// Results are used once and not stored.
    #[default]
    SingleUse,
    /// Results may be stored.
    Storage,
}

impl IntendedUse {
    /// Wire name of the value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleUse => "SingleUse",
            Self::Storage => "Storage",
        }
    }
}

/// Data source settings of a place index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfiguration {
    /// Intended use of the results.
    #[serde(default)]
    pub intended_use: IntendedUse,
}

/// Create request for an app cookie stickiness policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAppCookieStickinessPolicy {
    pub load_balancer: String,
    pub policy_name: String,
    pub cookie_name: String,
}

/// Create request for a place index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlaceIndex {
    pub index_name: String,
    pub data_source: String,
    pub data_source_configuration: Option<DataSourceConfiguration>,
    pub description: Option<String>,
    pub tags: TagSet,
}

/// Create request, typed by entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRequest {
    AppCookieStickinessPolicy(CreateAppCookieStickinessPolicy),
    PlaceIndex(CreatePlaceIndex),
}

impl CreateRequest {
    /// Kind of entity the request creates.
    pub fn kind(&self) -> EntityType {
        match self {
            Self::AppCookieStickinessPolicy(_) => EntityType::AppCookieStickinessPolicy,
            Self::PlaceIndex(_) => EntityType::PlaceIndex,
        }
    }
}

/// Update request for a place index. Fields left `None` are not changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlaceIndex {
    pub description: Option<String>,
    pub data_source_configuration: Option<DataSourceConfiguration>,
    /// Deprecated upstream but still mandatory on every call.
    pub pricing_plan: String,
}

/// Update request, typed by entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRequest {
    PlaceIndex(UpdatePlaceIndex),
}

/// Kind-specific attributes mirrored from the desired configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityAttributes {
    AppCookieStickinessPolicy {
        cookie_name: String,
    },
    PlaceIndex {
        data_source: String,
        data_source_configuration: Option<DataSourceConfiguration>,
        description: Option<String>,
    },
}

/// A remote entity as observed from the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntity {
    /// Address of the entity.
    pub entity: EntityRef,
    /// Globally unique resource name, if the kind has one.
    pub arn: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub attributes: EntityAttributes,
    /// Tags as reported by the control plane, unfiltered.
    pub tags: TagSet,
}

/// Owner-side slot an entity must be attached to in order to be live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssociationTarget {
    /// A listener of a classic load balancer.
    Listener { load_balancer: String, port: u16 },
}

impl AssociationTarget {
    /// Name of the owning resource.
    pub fn owner(&self) -> &str {
        match self {
            Self::Listener { load_balancer, .. } => load_balancer,
        }
    }
}

impl fmt::Display for AssociationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listener {
                load_balancer,
                port,
            } => write!(f, "listener {load_balancer}:{port}"),
        }
    }
}

/// An association the engine maintains: `member` attached to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub target: AssociationTarget,
    pub member: String,
}
