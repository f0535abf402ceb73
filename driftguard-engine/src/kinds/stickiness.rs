//! Application-cookie stickiness policy on a classic load balancer listener.
//!
//! The policy is created on the load balancer and only takes effect once it
//! is attached to a listener, so the kind declares an association. Every
//! field is creation-only and the policy has no tags.

use super::EntityKind;
use crate::client::{
    Association, AssociationTarget, CreateAppCookieStickinessPolicy, CreateRequest,
    EntityAttributes, EntityRef, EntityType, RemoteEntity, RemoteError, RemoteResult,
};
use crate::schema::{self, Field, FieldError};
use crate::store::ConfigStore;
use driftguard_types::{DELIMITER, ListenerPolicyId, TagSet};
use serde_json::Value;

const POLICY_NAME: &str = "name";
const LOAD_BALANCER: &str = "load_balancer";
const LB_PORT: &str = "lb_port";
const COOKIE_NAME: &str = "cookie_name";

/// Validated configuration of a stickiness policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickinessPolicyConfig {
    pub name: String,
    pub load_balancer: String,
    pub lb_port: u16,
    pub cookie_name: String,
}

/// The app cookie stickiness policy kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppCookieStickinessPolicy;

/// Policy names are alphanumerics and hyphens only.
fn validate_policy_name(name: &str) -> Result<(), FieldError> {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        Ok(())
    } else {
        Err(FieldError::new(
            POLICY_NAME,
            format!("{name:?} may only contain alphanumeric characters and hyphens"),
        ))
    }
}

fn validate_load_balancer(name: &str) -> Result<(), FieldError> {
    if name.contains(DELIMITER) {
        return Err(FieldError::new(
            LOAD_BALANCER,
            format!("{name:?} must not contain {DELIMITER:?}"),
        ));
    }
    Ok(())
}

impl EntityKind for AppCookieStickinessPolicy {
    type Config = StickinessPolicyConfig;
    type Id = ListenerPolicyId;

    const NAME: &'static str = "app cookie stickiness policy";
    const TYPE: EntityType = EntityType::AppCookieStickinessPolicy;
    const SCHEMA: &'static [Field] = &[
        Field::required(POLICY_NAME).force_new(),
        Field::required(LOAD_BALANCER).force_new(),
        Field::required(LB_PORT).force_new(),
        Field::required(COOKIE_NAME).force_new(),
    ];

    fn load(store: &dyn ConfigStore) -> Result<Self::Config, FieldError> {
        let name = schema::required_string(store, POLICY_NAME)?;
        validate_policy_name(&name)?;
        let load_balancer = schema::required_string(store, LOAD_BALANCER)?;
        validate_load_balancer(&load_balancer)?;

        Ok(StickinessPolicyConfig {
            name,
            load_balancer,
            lb_port: schema::required_port(store, LB_PORT)?,
            cookie_name: schema::required_string(store, COOKIE_NAME)?,
        })
    }

    fn identify(config: &Self::Config, _created: &RemoteEntity) -> Self::Id {
        ListenerPolicyId::new(&config.load_balancer, config.lb_port, &config.name)
    }

    fn locate(id: &Self::Id) -> EntityRef {
        EntityRef::owned(Self::TYPE, &id.load_balancer, &id.policy_name)
    }

    fn create_request(config: &Self::Config, _tags: TagSet) -> CreateRequest {
        CreateRequest::AppCookieStickinessPolicy(CreateAppCookieStickinessPolicy {
            load_balancer: config.load_balancer.clone(),
            policy_name: config.name.clone(),
            cookie_name: config.cookie_name.clone(),
        })
    }

    fn association(id: &Self::Id) -> Option<Association> {
        Some(Association {
            target: AssociationTarget::Listener {
                load_balancer: id.load_balancer.clone(),
                port: id.port,
            },
            member: id.policy_name.clone(),
        })
    }

    fn flatten(
        id: &Self::Id,
        remote: &RemoteEntity,
        store: &mut dyn ConfigStore,
    ) -> RemoteResult<()> {
        let EntityAttributes::AppCookieStickinessPolicy { cookie_name } = &remote.attributes else {
            return Err(RemoteError::Unexpected(format!(
                "{} returned attributes of another kind",
                remote.entity
            )));
        };

        store.set(POLICY_NAME, Value::from(id.policy_name.as_str()));
        store.set(LOAD_BALANCER, Value::from(id.load_balancer.as_str()));
        store.set(LB_PORT, Value::from(id.port));
        store.set(COOKIE_NAME, Value::from(cookie_name.as_str()));
        Ok(())
    }
}
