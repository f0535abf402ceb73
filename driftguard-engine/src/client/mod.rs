//! Remote entity client contract.
//!
//! Every method is a single remote call. Errors come back verbatim; retries,
//! if any, belong to the transport underneath an implementation.

pub mod memory;
mod model;

pub use memory::{CallKind, ControlPlaneConfig, InMemoryControlPlane};
pub use model::{
    Association, AssociationTarget, CreateAppCookieStickinessPolicy, CreatePlaceIndex,
    CreateRequest, DataSourceConfiguration, EntityAttributes, EntityRef, EntityType,
    IntendedUse, PRICING_PLAN_REQUEST_BASED_USAGE, RemoteEntity, UpdatePlaceIndex,
    UpdateRequest,
};

use async_trait::async_trait;
use driftguard_types::TagSet;
use std::fmt;
use thiserror::Error;

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// What a not-found error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundScope {
    /// The entity itself.
    Entity,
    /// The resource that owns the entity (e.g. its load balancer).
    Owner,
}

impl fmt::Display for NotFoundScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => f.write_str("entity"),
            Self::Owner => f.write_str("owner"),
        }
    }
}

/// Errors reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The addressed entity or its owner does not exist.
    #[error("{scope} not found: {name}")]
    NotFound { scope: NotFoundScope, name: String },

    /// Any other error returned by the control plane.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl RemoteError {
    /// Not-found error for the entity itself.
    pub fn entity_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            scope: NotFoundScope::Entity,
            name: name.into(),
        }
    }

    /// Not-found error for the entity's owner.
    pub fn owner_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            scope: NotFoundScope::Owner,
            name: name.into(),
        }
    }

    /// Generic API error.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns true for any not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true when the owner, not the entity, is missing.
    pub fn is_owner_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound {
                scope: NotFoundScope::Owner,
                ..
            }
        )
    }
}

/// Narrow contract the reconciler drives the control plane through.
#[async_trait]
pub trait RemoteEntityClient: Send + Sync {
    /// Creates an entity. The response carries enough to compute its
    /// identifier without a second call.
    async fn create(&self, request: &CreateRequest) -> RemoteResult<RemoteEntity>;

    /// Describes an existing entity.
    async fn describe(&self, entity: &EntityRef) -> RemoteResult<RemoteEntity>;

    /// Applies an in-place update.
    async fn update(&self, entity: &EntityRef, request: &UpdateRequest) -> RemoteResult<()>;

    /// Deletes an entity.
    async fn delete(&self, entity: &EntityRef) -> RemoteResult<()>;

    /// Replaces the members attached to `target`. An empty slice detaches
    /// everything.
    async fn set_association(
        &self,
        target: &AssociationTarget,
        members: &[String],
    ) -> RemoteResult<()>;

    /// Lists the members currently attached to `target`.
    async fn describe_association(&self, target: &AssociationTarget) -> RemoteResult<Vec<String>>;

    /// Adds or overwrites tags on the resource named `arn`.
    async fn tag_resource(&self, arn: &str, tags: &TagSet) -> RemoteResult<()>;

    /// Removes tag keys from the resource named `arn`.
    async fn untag_resource(&self, arn: &str, keys: &[String]) -> RemoteResult<()>;
}
