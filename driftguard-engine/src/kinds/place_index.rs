//! Geocoding place index.

use super::{EntityKind, string_or_null};
use crate::client::{
    CreatePlaceIndex, CreateRequest, DataSourceConfiguration, EntityAttributes, EntityRef,
    EntityType, PRICING_PLAN_REQUEST_BASED_USAGE, RemoteEntity, RemoteError, RemoteResult,
    UpdatePlaceIndex, UpdateRequest,
};
use crate::schema::{self, Field, FieldError, TAGS, TAGS_ALL};
use crate::store::ConfigStore;
use chrono::{DateTime, SecondsFormat, Utc};
use driftguard_types::{NaturalKey, TagSet};
use serde_json::{Value, json};

const INDEX_NAME: &str = "index_name";
const DATA_SOURCE: &str = "data_source";
const DATA_SOURCE_CONFIGURATION: &str = "data_source_configuration";
const DESCRIPTION: &str = "description";
const INDEX_ARN: &str = "index_arn";
const CREATE_TIME: &str = "create_time";
const UPDATE_TIME: &str = "update_time";

const MAX_INDEX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// Validated configuration of a place index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceIndexConfig {
    pub index_name: String,
    pub data_source: String,
    pub data_source_configuration: Option<DataSourceConfiguration>,
    pub description: Option<String>,
    pub tags: TagSet,
}

/// The place index kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceIndex;

fn timestamp(time: Option<DateTime<Utc>>) -> Value {
    time.map_or(Value::Null, |t| {
        Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true))
    })
}

fn configuration_value(configuration: Option<&DataSourceConfiguration>) -> Value {
    configuration.map_or(Value::Null, |c| {
        json!({ "intended_use": c.intended_use.as_str() })
    })
}

impl EntityKind for PlaceIndex {
    type Config = PlaceIndexConfig;
    type Id = NaturalKey;

    const NAME: &'static str = "place index";
    const TYPE: EntityType = EntityType::PlaceIndex;
    const SCHEMA: &'static [Field] = &[
        Field::required(INDEX_NAME).force_new(),
        Field::required(DATA_SOURCE).force_new(),
        Field::optional_computed(DATA_SOURCE_CONFIGURATION),
        Field::optional(DESCRIPTION),
        Field::optional(TAGS),
        Field::computed(TAGS_ALL),
        Field::computed(INDEX_ARN),
        Field::computed(CREATE_TIME),
        Field::computed(UPDATE_TIME),
    ];
    const TAGGABLE: bool = true;
    const ARN_FIELD: Option<&'static str> = Some(INDEX_ARN);

    fn load(store: &dyn ConfigStore) -> Result<Self::Config, FieldError> {
        let index_name = schema::required_string(store, INDEX_NAME)?;
        schema::check_length(INDEX_NAME, &index_name, 1, MAX_INDEX_NAME_LEN)?;
        let description = schema::optional_string(store, DESCRIPTION)?;
        if let Some(description) = &description {
            schema::check_length(DESCRIPTION, description, 0, MAX_DESCRIPTION_LEN)?;
        }

        Ok(PlaceIndexConfig {
            index_name,
            data_source: schema::required_string(store, DATA_SOURCE)?,
            data_source_configuration: schema::optional_object(store, DATA_SOURCE_CONFIGURATION)?,
            description,
            tags: schema::tag_set(store, TAGS)?,
        })
    }

    fn identify(_config: &Self::Config, created: &RemoteEntity) -> Self::Id {
        NaturalKey::new(&created.entity.name)
    }

    fn locate(id: &Self::Id) -> EntityRef {
        EntityRef::top_level(Self::TYPE, id.as_str())
    }

    fn create_request(config: &Self::Config, tags: TagSet) -> CreateRequest {
        CreateRequest::PlaceIndex(CreatePlaceIndex {
            index_name: config.index_name.clone(),
            data_source: config.data_source.clone(),
            data_source_configuration: config.data_source_configuration.clone(),
            description: config.description.clone(),
            tags,
        })
    }

    fn update_request(
        _id: &Self::Id,
        config: &Self::Config,
        changed: &[&'static str],
    ) -> Option<UpdateRequest> {
        // A removed description is cleared by sending it empty.
        let description = changed
            .contains(&DESCRIPTION)
            .then(|| config.description.clone().unwrap_or_default());
        let data_source_configuration = changed
            .contains(&DATA_SOURCE_CONFIGURATION)
            .then(|| config.data_source_configuration.clone().unwrap_or_default());

        Some(UpdateRequest::PlaceIndex(UpdatePlaceIndex {
            description,
            data_source_configuration,
            pricing_plan: PRICING_PLAN_REQUEST_BASED_USAGE.to_string(),
        }))
    }

    fn normalize(config: &Self::Config, store: &mut dyn ConfigStore) {
        // `{}` means the default intended use; "" means no description.
        store.set(
            DATA_SOURCE_CONFIGURATION,
            configuration_value(config.data_source_configuration.as_ref()),
        );
        store.set(DESCRIPTION, string_or_null(config.description.as_deref()));
    }

    fn declared_tags(config: &Self::Config) -> TagSet {
        config.tags.clone()
    }

    fn flatten(
        _id: &Self::Id,
        remote: &RemoteEntity,
        store: &mut dyn ConfigStore,
    ) -> RemoteResult<()> {
        let EntityAttributes::PlaceIndex {
            data_source,
            data_source_configuration,
            description,
        } = &remote.attributes
        else {
            return Err(RemoteError::Unexpected(format!(
                "{} returned attributes of another kind",
                remote.entity
            )));
        };

        store.set(INDEX_NAME, Value::from(remote.entity.name.as_str()));
        store.set(DATA_SOURCE, Value::from(data_source.as_str()));
        store.set(
            DATA_SOURCE_CONFIGURATION,
            configuration_value(data_source_configuration.as_ref()),
        );
        store.set(DESCRIPTION, string_or_null(description.as_deref()));
        store.set(INDEX_ARN, string_or_null(remote.arn.as_deref()));
        store.set(CREATE_TIME, timestamp(remote.created_at));
        store.set(UPDATE_TIME, timestamp(remote.updated_at));
        Ok(())
    }
}
