//! Error types for the reconciliation engine.

use crate::client::RemoteError;
use crate::reconciler::LifecycleState;
use crate::schema::FieldError;
use driftguard_types::IdentifierError;
use std::fmt;
use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Operation a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        };
        f.write_str(name)
    }
}

/// Failures surfaced to the caller of a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The create call was rejected.
    #[error("creating {kind}: {source}")]
    CreateFailed {
        kind: &'static str,
        #[source]
        source: RemoteError,
    },

    /// Describing the entity (or its association) failed.
    #[error("reading {kind} ({id}): {source}")]
    ReadFailed {
        kind: &'static str,
        id: String,
        #[source]
        source: RemoteError,
    },

    /// The in-place update call was rejected.
    #[error("updating {kind} ({id}): {source}")]
    UpdateFailed {
        kind: &'static str,
        id: String,
        #[source]
        source: RemoteError,
    },

    /// The delete call was rejected. The identifier is kept for a retry.
    #[error("deleting {kind} ({id}): {source}")]
    DeleteFailed {
        kind: &'static str,
        id: String,
        #[source]
        source: RemoteError,
    },

    /// Updating tags on the resource failed.
    #[error("updating tags for {kind} ({resource}): {source}")]
    TagUpdateFailed {
        kind: &'static str,
        resource: String,
        #[source]
        source: RemoteError,
    },

    /// The persisted identifier could not be decoded.
    #[error("{operation}: {source}")]
    MalformedIdentifier {
        operation: Operation,
        #[source]
        source: IdentifierError,
    },

    /// Attaching or detaching the entity failed.
    #[error("{operation} {kind} ({id}): setting association: {source}")]
    AssociationFailed {
        kind: &'static str,
        id: String,
        operation: Operation,
        #[source]
        source: RemoteError,
    },

    /// A force-new field changed; the entity must be replaced, not updated.
    #[error("updating {kind} ({id}): field {field:?} cannot change in place")]
    ReplacementRequired {
        kind: &'static str,
        id: String,
        field: &'static str,
    },

    /// Mutable fields changed on a kind with no update call.
    #[error("updating {kind} ({id}): kind does not support in-place update")]
    UpdateUnsupported { kind: &'static str, id: String },

    /// The desired configuration failed validation.
    #[error("{operation} {kind}: invalid configuration: {source}")]
    InvalidConfig {
        kind: &'static str,
        operation: Operation,
        #[source]
        source: FieldError,
    },

    /// The operation needs an identifier and none is persisted.
    #[error("{operation} {kind}: no identifier recorded")]
    MissingIdentifier {
        kind: &'static str,
        operation: Operation,
    },
}

impl ReconcileError {
    /// Operation the failure originated from.
    pub fn operation(&self) -> Operation {
        match self {
            Self::CreateFailed { .. } => Operation::Create,
            Self::ReadFailed { .. } => Operation::Read,
            Self::UpdateFailed { .. }
            | Self::TagUpdateFailed { .. }
            | Self::ReplacementRequired { .. }
            | Self::UpdateUnsupported { .. } => Operation::Update,
            Self::DeleteFailed { .. } => Operation::Delete,
            Self::AssociationFailed { operation, .. }
            | Self::MalformedIdentifier { operation, .. }
            | Self::InvalidConfig { operation, .. }
            | Self::MissingIdentifier { operation, .. } => *operation,
        }
    }

    /// State the entity is left in, when the failure determines it.
    pub fn resulting_state(&self) -> Option<LifecycleState> {
        match self {
            Self::AssociationFailed {
                operation: Operation::Create,
                ..
            } => Some(LifecycleState::Orphaned),
            Self::AssociationFailed { .. } | Self::DeleteFailed { .. } => {
                Some(LifecycleState::Active)
            }
            Self::CreateFailed { .. } => Some(LifecycleState::Absent),
            _ => None,
        }
    }

    /// Remote error underneath this failure, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::CreateFailed { source, .. }
            | Self::ReadFailed { source, .. }
            | Self::UpdateFailed { source, .. }
            | Self::DeleteFailed { source, .. }
            | Self::TagUpdateFailed { source, .. }
            | Self::AssociationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
