//! In-memory control plane.
//!
//! Simulates the two entity kinds the engine ships with: stickiness policies
//! that live on a load balancer and must be attached to one of its listeners,
//! and standalone, taggable place indexes. Enforces the same constraints the
//! real API does where the reconciler depends on them (a policy still in use
//! by a listener cannot be deleted, the update call insists on a pricing
//! plan, `aws:` tags cannot be written). Every call is recorded, and a
//! one-shot failure can be injected per call kind.

use super::model::{
    AssociationTarget, CreateRequest, DataSourceConfiguration, EntityAttributes, EntityRef,
    EntityType, RemoteEntity, UpdateRequest,
};
use super::{RemoteEntityClient, RemoteError, RemoteResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftguard_types::TagSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

const RESERVED_TAG_PREFIX: &str = "aws:";

/// Settings used to build resource names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    pub partition: String,
    pub region: String,
    pub account_id: String,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            partition: "aws".to_string(),
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
        }
    }
}

/// Remote call kinds, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Create,
    Describe,
    Update,
    Delete,
    SetAssociation,
    DescribeAssociation,
    TagResource,
    UntagResource,
}

#[derive(Debug, Clone)]
struct StoredPolicy {
    cookie_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct LoadBalancer {
    /// Listener port -> attached policy names.
    listeners: BTreeMap<u16, Vec<String>>,
    policies: BTreeMap<String, StoredPolicy>,
}

#[derive(Debug, Clone)]
struct StoredPlaceIndex {
    data_source: String,
    data_source_configuration: Option<DataSourceConfiguration>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ControlPlaneState {
    load_balancers: BTreeMap<String, LoadBalancer>,
    place_indexes: BTreeMap<String, StoredPlaceIndex>,
    /// ARN -> tags.
    tags: BTreeMap<String, TagSet>,
    calls: Vec<CallKind>,
    faults: HashMap<CallKind, RemoteError>,
}

impl ControlPlaneState {
    /// Records the call and returns the injected fault for it, if any.
    fn begin(&mut self, call: CallKind) -> RemoteResult<()> {
        self.calls.push(call);
        match self.faults.remove(&call) {
            Some(err) => {
                debug!(?call, error = %err, "Injected fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn load_balancer(&self, name: &str) -> RemoteResult<&LoadBalancer> {
        self.load_balancers
            .get(name)
            .ok_or_else(|| RemoteError::owner_not_found(name))
    }

    fn load_balancer_mut(&mut self, name: &str) -> RemoteResult<&mut LoadBalancer> {
        self.load_balancers
            .get_mut(name)
            .ok_or_else(|| RemoteError::owner_not_found(name))
    }
}

/// Control plane kept entirely in memory.
pub struct InMemoryControlPlane {
    config: ControlPlaneConfig,
    state: Mutex<ControlPlaneState>,
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new(ControlPlaneConfig::default())
    }
}

impl InMemoryControlPlane {
    /// Creates an empty control plane.
    pub fn new(config: ControlPlaneConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ControlPlaneState::default()),
        }
    }

    /// Resource name a place index gets on creation.
    pub fn place_index_arn(&self, index_name: &str) -> String {
        format!(
            "arn:{}:geo:{}:{}:place-index/{index_name}",
            self.config.partition, self.config.region, self.config.account_id
        )
    }

    // ── Fixtures and inspection ──────────────────────────────────

    /// Adds a load balancer with listeners on the given ports.
    pub async fn add_load_balancer(&self, name: &str, ports: &[u16]) {
        let mut state = self.state.lock().await;
        let lb = state.load_balancers.entry(name.to_string()).or_default();
        for port in ports {
            lb.listeners.entry(*port).or_default();
        }
    }

    /// Removes a load balancer and everything on it, out of band.
    pub async fn remove_load_balancer(&self, name: &str) {
        self.state.lock().await.load_balancers.remove(name);
    }

    /// Removes one listener and its attachments, out of band.
    pub async fn remove_listener(&self, load_balancer: &str, port: u16) {
        let mut state = self.state.lock().await;
        if let Some(lb) = state.load_balancers.get_mut(load_balancer) {
            lb.listeners.remove(&port);
        }
    }

    /// Deletes an entity out of band, bypassing every API constraint.
    pub async fn remove_entity(&self, entity: &EntityRef) {
        let mut state = self.state.lock().await;
        match entity.kind {
            EntityType::AppCookieStickinessPolicy => {
                let Some(owner) = entity.owner.as_deref() else {
                    return;
                };
                if let Some(lb) = state.load_balancers.get_mut(owner) {
                    lb.policies.remove(&entity.name);
                }
            }
            EntityType::PlaceIndex => {
                state.place_indexes.remove(&entity.name);
                state.tags.remove(&self.place_index_arn(&entity.name));
            }
        }
    }

    /// Replaces a resource's tags out of band.
    pub async fn set_remote_tags(&self, arn: &str, tags: TagSet) {
        self.state.lock().await.tags.insert(arn.to_string(), tags);
    }

    /// Policies attached to a listener, without going through the API.
    pub async fn listener_policies(&self, load_balancer: &str, port: u16) -> Option<Vec<String>> {
        let state = self.state.lock().await;
        state
            .load_balancers
            .get(load_balancer)
            .and_then(|lb| lb.listeners.get(&port))
            .cloned()
    }

    /// Tags on a resource, without going through the API.
    pub async fn tags_of(&self, arn: &str) -> TagSet {
        let state = self.state.lock().await;
        state.tags.get(arn).cloned().unwrap_or_default()
    }

    /// Returns whether the entity currently exists.
    pub async fn contains(&self, entity: &EntityRef) -> bool {
        let state = self.state.lock().await;
        match entity.kind {
            EntityType::AppCookieStickinessPolicy => entity
                .owner
                .as_deref()
                .and_then(|owner| state.load_balancers.get(owner))
                .is_some_and(|lb| lb.policies.contains_key(&entity.name)),
            EntityType::PlaceIndex => state.place_indexes.contains_key(&entity.name),
        }
    }

    /// Makes the next call of `call` fail with `err`.
    pub async fn fail_next(&self, call: CallKind, err: RemoteError) {
        self.state.lock().await.faults.insert(call, err);
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<CallKind> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls of the given kind made so far.
    pub async fn call_count(&self, call: CallKind) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }

    // ── Internals ────────────────────────────────────────────────

    fn policy_owner(entity: &EntityRef) -> RemoteResult<&str> {
        entity.owner.as_deref().ok_or_else(|| {
            RemoteError::Unexpected(format!("{entity} is missing its load balancer"))
        })
    }

    fn place_index_entity(
        &self,
        state: &ControlPlaneState,
        name: &str,
        stored: &StoredPlaceIndex,
    ) -> RemoteEntity {
        let arn = self.place_index_arn(name);
        RemoteEntity {
            entity: EntityRef::top_level(EntityType::PlaceIndex, name),
            tags: state.tags.get(&arn).cloned().unwrap_or_default(),
            arn: Some(arn),
            created_at: Some(stored.created_at),
            updated_at: Some(stored.updated_at),
            attributes: EntityAttributes::PlaceIndex {
                data_source: stored.data_source.clone(),
                data_source_configuration: stored.data_source_configuration.clone(),
                description: stored.description.clone(),
            },
        }
    }

    fn policy_entity(load_balancer: &str, name: &str, stored: &StoredPolicy) -> RemoteEntity {
        RemoteEntity {
            entity: EntityRef::owned(EntityType::AppCookieStickinessPolicy, load_balancer, name),
            arn: None,
            created_at: Some(stored.created_at),
            updated_at: None,
            attributes: EntityAttributes::AppCookieStickinessPolicy {
                cookie_name: stored.cookie_name.clone(),
            },
            tags: TagSet::new(),
        }
    }

    fn check_writable(tags: &TagSet) -> RemoteResult<()> {
        match tags.keys().find(|k| k.starts_with(RESERVED_TAG_PREFIX)) {
            Some(key) => Err(RemoteError::api(
                "ValidationException",
                format!("tag key {key:?} uses a reserved prefix"),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteEntityClient for InMemoryControlPlane {
    async fn create(&self, request: &CreateRequest) -> RemoteResult<RemoteEntity> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::Create)?;
        let now = Utc::now();

        match request {
            CreateRequest::AppCookieStickinessPolicy(req) => {
                let lb = state.load_balancer_mut(&req.load_balancer)?;
                if lb.policies.contains_key(&req.policy_name) {
                    return Err(RemoteError::api(
                        "DuplicatePolicyName",
                        format!("policy {} already exists", req.policy_name),
                    ));
                }
                let stored = StoredPolicy {
                    cookie_name: req.cookie_name.clone(),
                    created_at: now,
                };
                lb.policies.insert(req.policy_name.clone(), stored.clone());
                debug!(lb = %req.load_balancer, policy = %req.policy_name, "Created policy");
                Ok(Self::policy_entity(&req.load_balancer, &req.policy_name, &stored))
            }
            CreateRequest::PlaceIndex(req) => {
                if state.place_indexes.contains_key(&req.index_name) {
                    return Err(RemoteError::api(
                        "ConflictException",
                        format!("place index {} already exists", req.index_name),
                    ));
                }
                Self::check_writable(&req.tags)?;
                let stored = StoredPlaceIndex {
                    data_source: req.data_source.clone(),
                    data_source_configuration: req.data_source_configuration.clone(),
                    description: req.description.clone(),
                    created_at: now,
                    updated_at: now,
                };
                if !req.tags.is_empty() {
                    let arn = self.place_index_arn(&req.index_name);
                    state.tags.insert(arn, req.tags.clone());
                }
                state
                    .place_indexes
                    .insert(req.index_name.clone(), stored.clone());
                debug!(index = %req.index_name, "Created place index");
                Ok(self.place_index_entity(&state, &req.index_name, &stored))
            }
        }
    }

    async fn describe(&self, entity: &EntityRef) -> RemoteResult<RemoteEntity> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::Describe)?;

        match entity.kind {
            EntityType::AppCookieStickinessPolicy => {
                let owner = Self::policy_owner(entity)?;
                let stored = state
                    .load_balancer(owner)?
                    .policies
                    .get(&entity.name)
                    .ok_or_else(|| RemoteError::entity_not_found(&entity.name))?;
                Ok(Self::policy_entity(owner, &entity.name, stored))
            }
            EntityType::PlaceIndex => {
                let stored = state
                    .place_indexes
                    .get(&entity.name)
                    .ok_or_else(|| RemoteError::entity_not_found(&entity.name))?;
                Ok(self.place_index_entity(&state, &entity.name, stored))
            }
        }
    }

    async fn update(&self, entity: &EntityRef, request: &UpdateRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::Update)?;

        if entity.kind != EntityType::PlaceIndex {
            return Err(RemoteError::api(
                "InvalidAction",
                format!("{} does not support update", entity.kind),
            ));
        }
        let UpdateRequest::PlaceIndex(req) = request;
        if req.pricing_plan.is_empty() {
            return Err(RemoteError::api(
                "ValidationException",
                "PricingPlan is required",
            ));
        }
        let stored = state
            .place_indexes
            .get_mut(&entity.name)
            .ok_or_else(|| RemoteError::entity_not_found(&entity.name))?;
        if let Some(description) = &req.description {
            stored.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(configuration) = &req.data_source_configuration {
            stored.data_source_configuration = Some(configuration.clone());
        }
        stored.updated_at = Utc::now();
        debug!(index = %entity.name, "Updated place index");
        Ok(())
    }

    async fn delete(&self, entity: &EntityRef) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::Delete)?;

        match entity.kind {
            EntityType::AppCookieStickinessPolicy => {
                let owner = Self::policy_owner(entity)?;
                let lb = state.load_balancer_mut(owner)?;
                if !lb.policies.contains_key(&entity.name) {
                    return Err(RemoteError::entity_not_found(&entity.name));
                }
                if let Some((port, _)) = lb
                    .listeners
                    .iter()
                    .find(|(_, attached)| attached.contains(&entity.name))
                {
                    return Err(RemoteError::api(
                        "InvalidConfigurationRequest",
                        format!("policy {} is in use by listener {port}", entity.name),
                    ));
                }
                lb.policies.remove(&entity.name);
                debug!(lb = %owner, policy = %entity.name, "Deleted policy");
                Ok(())
            }
            EntityType::PlaceIndex => {
                if state.place_indexes.remove(&entity.name).is_none() {
                    return Err(RemoteError::entity_not_found(&entity.name));
                }
                state.tags.remove(&self.place_index_arn(&entity.name));
                debug!(index = %entity.name, "Deleted place index");
                Ok(())
            }
        }
    }

    async fn set_association(
        &self,
        target: &AssociationTarget,
        members: &[String],
    ) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::SetAssociation)?;

        let AssociationTarget::Listener {
            load_balancer,
            port,
        } = target;
        let lb = state.load_balancer_mut(load_balancer)?;
        if let Some(missing) = members.iter().find(|m| !lb.policies.contains_key(*m)) {
            return Err(RemoteError::entity_not_found(missing));
        }
        // The listener owns the attachment, so losing it is an owner miss.
        let attached = lb
            .listeners
            .get_mut(port)
            .ok_or_else(|| RemoteError::owner_not_found(target.to_string()))?;
        *attached = members.to_vec();
        debug!(%target, members = members.len(), "Set listener policies");
        Ok(())
    }

    async fn describe_association(&self, target: &AssociationTarget) -> RemoteResult<Vec<String>> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::DescribeAssociation)?;

        let AssociationTarget::Listener {
            load_balancer,
            port,
        } = target;
        let lb = state.load_balancer(load_balancer)?;
        Ok(lb.listeners.get(port).cloned().unwrap_or_default())
    }

    async fn tag_resource(&self, arn: &str, tags: &TagSet) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::TagResource)?;

        let known = state
            .place_indexes
            .keys()
            .any(|name| self.place_index_arn(name) == arn);
        if !known {
            return Err(RemoteError::entity_not_found(arn));
        }
        Self::check_writable(tags)?;
        let current = state.tags.entry(arn.to_string()).or_default();
        *current = current.merge(tags);
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.begin(CallKind::UntagResource)?;

        let known = state
            .place_indexes
            .keys()
            .any(|name| self.place_index_arn(name) == arn);
        if !known {
            return Err(RemoteError::entity_not_found(arn));
        }
        if let Some(current) = state.tags.get_mut(arn) {
            for key in keys {
                current.remove(key);
            }
        }
        Ok(())
    }
}
