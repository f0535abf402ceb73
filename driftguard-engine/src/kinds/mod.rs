//! Entity kinds the reconciler can drive.
//!
//! A kind ties together the typed configuration, the identifier scheme and
//! the request/response mapping for one type of remote entity. The
//! reconciler is generic over [`EntityKind`] and contains no per-kind logic.

mod place_index;
mod stickiness;

pub use place_index::{PlaceIndex, PlaceIndexConfig};
pub use stickiness::{AppCookieStickinessPolicy, StickinessPolicyConfig};

use crate::client::{
    Association, CreateRequest, EntityRef, EntityType, RemoteEntity, RemoteResult, UpdateRequest,
};
use crate::schema::{Field, FieldError};
use crate::store::ConfigStore;
use driftguard_types::{EntityIdentifier, TagSet};
use serde_json::Value;

/// One type of remote entity.
pub trait EntityKind: Send + Sync + 'static {
    /// Validated desired configuration.
    type Config: Send + Sync;
    /// Local identifier scheme.
    type Id: EntityIdentifier + Send + Sync;

    /// Human-readable kind name used in errors and logs.
    const NAME: &'static str;
    /// Control-plane entity type.
    const TYPE: EntityType;
    /// Field declarations.
    const SCHEMA: &'static [Field];
    /// Whether the entity carries tags.
    const TAGGABLE: bool = false;
    /// Field holding the entity's resource name, for kinds that have one.
    const ARN_FIELD: Option<&'static str> = None;

    /// Loads and validates the desired configuration.
    fn load(store: &dyn ConfigStore) -> Result<Self::Config, FieldError>;

    /// Computes the identifier of a freshly created entity without another
    /// remote call.
    fn identify(config: &Self::Config, created: &RemoteEntity) -> Self::Id;

    /// Address of the entity on the control plane.
    fn locate(id: &Self::Id) -> EntityRef;

    /// Builds the create request. `tags` are the effective tags.
    fn create_request(config: &Self::Config, tags: TagSet) -> CreateRequest;

    /// Association the entity needs in order to be live.
    fn association(_id: &Self::Id) -> Option<Association> {
        None
    }

    /// Builds the in-place update request for the `changed` fields.
    /// `None` means the kind cannot be updated in place.
    fn update_request(
        _id: &Self::Id,
        _config: &Self::Config,
        _changed: &[&'static str],
    ) -> Option<UpdateRequest> {
        None
    }

    /// Rewrites declared fields in the form [`flatten`](Self::flatten) reads
    /// them back in, so an unchanged declaration never looks changed.
    fn normalize(_config: &Self::Config, _store: &mut dyn ConfigStore) {}

    /// Tags declared on the entity itself.
    fn declared_tags(_config: &Self::Config) -> TagSet {
        TagSet::new()
    }

    /// Writes mirrored and computed attributes back into the store.
    fn flatten(
        id: &Self::Id,
        remote: &RemoteEntity,
        store: &mut dyn ConfigStore,
    ) -> RemoteResult<()>;
}

/// JSON object holding a tag set.
pub(crate) fn tags_value(tags: &TagSet) -> Value {
    Value::Object(
        tags.iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    )
}

/// String value, or null for `None`.
pub(crate) fn string_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}
