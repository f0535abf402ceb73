//! Reconciliation passes.
//!
//! A [`Reconciler`] drives one entity kind through create, read, update,
//! delete and import. Each pass is a straight sequence of awaited remote
//! calls; it keeps no state between passes beyond what it writes into the
//! [`ConfigStore`].

use crate::client::{RemoteEntityClient, RemoteError};
use crate::config::{ConfigResult, ProviderConfig};
use crate::error::{Operation, ReconcileError, ReconcileResult};
use crate::kinds::{EntityKind, tags_value};
use crate::schema::{self, TAGS, TAGS_ALL};
use crate::store::ConfigStore;
use driftguard_types::{EntityIdentifier, TagPolicy, TagSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where an entity is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No identifier recorded; nothing exists as far as the engine knows.
    Absent,
    Creating,
    Active,
    Updating,
    Deleting,
    /// Exists remotely, but its required association is missing.
    Orphaned,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Active => "active",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
            Self::Orphaned => "orphaned",
        };
        f.write_str(name)
    }
}

/// Why a steady-state read found the entity gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftCause {
    /// The entity itself was deleted.
    EntityNotFound,
    /// The resource owning the entity was deleted.
    OwnerNotFound,
    /// The entity exists but is no longer attached where it must be.
    AssociationMissing,
}

impl fmt::Display for DriftCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntityNotFound => f.write_str("entity not found"),
            Self::OwnerNotFound => f.write_str("owner not found"),
            Self::AssociationMissing => f.write_str("association missing"),
        }
    }
}

/// Result of a read pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The entity exists; observed state was written to the store.
    Active,
    /// The entity drifted away; the identifier was cleared.
    Absent(DriftCause),
}

impl ReadOutcome {
    pub fn state(&self) -> LifecycleState {
        match self {
            Self::Active => LifecycleState::Active,
            Self::Absent(_) => LifecycleState::Absent,
        }
    }
}

/// Drives entities of kind `K` toward their declared configuration.
pub struct Reconciler<K: EntityKind> {
    client: Arc<dyn RemoteEntityClient>,
    tags: TagPolicy,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntityKind> Reconciler<K> {
    /// Builds a reconciler, rejecting provider settings that could never be
    /// applied.
    pub fn new(
        client: Arc<dyn RemoteEntityClient>,
        provider: &ProviderConfig,
    ) -> ConfigResult<Self> {
        provider.validate()?;
        Ok(Self {
            client,
            tags: provider.tag_policy(),
            _kind: PhantomData,
        })
    }

    // ── Create ───────────────────────────────────────────────────

    /// Creates the entity, records its identifier and associates it.
    ///
    /// If the association fails the entity is left orphaned: the identifier
    /// stays recorded so a later delete can clean it up.
    pub async fn create(&self, store: &mut dyn ConfigStore) -> ReconcileResult<LifecycleState> {
        let config = K::load(store).map_err(|source| ReconcileError::InvalidConfig {
            kind: K::NAME,
            operation: Operation::Create,
            source,
        })?;
        K::normalize(&config, store);
        let tags = if K::TAGGABLE {
            self.writable_tags(&K::declared_tags(&config))
        } else {
            TagSet::new()
        };

        info!(kind = K::NAME, state = %LifecycleState::Creating, "Creating entity");
        let created = self
            .client
            .create(&K::create_request(&config, tags))
            .await
            .map_err(|source| ReconcileError::CreateFailed {
                kind: K::NAME,
                source,
            })?;

        let id = K::identify(&config, &created);
        let encoded = id.encode();
        store.set_identifier(Some(encoded.clone()));
        debug!(kind = K::NAME, id = %encoded, "Recorded identifier");

        if let Some(association) = K::association(&id) {
            let members = [association.member.clone()];
            if let Err(source) = self
                .client
                .set_association(&association.target, &members)
                .await
            {
                warn!(
                    kind = K::NAME,
                    id = %encoded,
                    target = %association.target,
                    error = %source,
                    "Entity created but association failed; left orphaned"
                );
                return Err(ReconcileError::AssociationFailed {
                    kind: K::NAME,
                    id: encoded,
                    operation: Operation::Create,
                    source,
                });
            }
            debug!(kind = K::NAME, id = %encoded, target = %association.target, "Associated");
        }

        let outcome = self.observe(&id, store, true).await?;
        info!(kind = K::NAME, id = %encoded, state = %outcome.state(), "Created entity");
        Ok(outcome.state())
    }

    // ── Read ─────────────────────────────────────────────────────

    /// Refreshes the store from remote state.
    pub async fn read(&self, store: &mut dyn ConfigStore) -> ReconcileResult<ReadOutcome> {
        let id = Self::tracked_id(store, Operation::Read)?;
        let fresh = store.is_first_pass();
        self.observe(&id, store, fresh).await
    }

    /// Describes the entity (and its association) and writes what it finds.
    ///
    /// On a `fresh` pass the entity was just created, so a missing entity is
    /// an error rather than drift.
    async fn observe(
        &self,
        id: &K::Id,
        store: &mut dyn ConfigStore,
        fresh: bool,
    ) -> ReconcileResult<ReadOutcome> {
        let encoded = id.encode();
        let read_failed = |source: RemoteError| ReconcileError::ReadFailed {
            kind: K::NAME,
            id: encoded.clone(),
            source,
        };

        let remote = match self.client.describe(&K::locate(id)).await {
            Ok(remote) => remote,
            Err(err) if err.is_not_found() && !fresh => {
                let cause = if err.is_owner_not_found() {
                    warn!(kind = K::NAME, id = %encoded, "Owner not found, removing entity from state");
                    DriftCause::OwnerNotFound
                } else {
                    warn!(kind = K::NAME, id = %encoded, "Entity not found, removing from state");
                    DriftCause::EntityNotFound
                };
                store.set_identifier(None);
                return Ok(ReadOutcome::Absent(cause));
            }
            Err(err) => return Err(read_failed(err)),
        };

        if let Some(association) = K::association(id) {
            let attached = match self.client.describe_association(&association.target).await {
                Ok(members) => members.contains(&association.member),
                Err(err) if err.is_owner_not_found() => false,
                Err(err) => return Err(read_failed(err)),
            };
            if !attached && !fresh {
                warn!(
                    kind = K::NAME,
                    id = %encoded,
                    target = %association.target,
                    "Entity not attached, removing from state"
                );
                store.set_identifier(None);
                return Ok(ReadOutcome::Absent(DriftCause::AssociationMissing));
            }
        }

        K::flatten(id, &remote, store).map_err(read_failed)?;

        if K::TAGGABLE {
            let views = self.tags.views(&remote.tags);
            store.set(TAGS, tags_value(&views.exposed));
            store.set(TAGS_ALL, tags_value(&views.all));
        }

        debug!(kind = K::NAME, id = %encoded, "Read entity");
        Ok(ReadOutcome::Active)
    }

    // ── Update ───────────────────────────────────────────────────

    /// Applies in-place changes, then tag changes, then re-reads.
    pub async fn update(&self, store: &mut dyn ConfigStore) -> ReconcileResult<LifecycleState> {
        let id = Self::tracked_id(store, Operation::Update)?;
        let encoded = id.encode();
        let config = K::load(store).map_err(|source| ReconcileError::InvalidConfig {
            kind: K::NAME,
            operation: Operation::Update,
            source,
        })?;
        K::normalize(&config, store);

        if let Some(field) = schema::changed_force_new(K::SCHEMA, store) {
            return Err(ReconcileError::ReplacementRequired {
                kind: K::NAME,
                id: encoded,
                field,
            });
        }

        let changed = schema::changed_updatable(K::SCHEMA, store);
        if !changed.is_empty() {
            let request = K::update_request(&id, &config, &changed).ok_or_else(|| {
                ReconcileError::UpdateUnsupported {
                    kind: K::NAME,
                    id: encoded.clone(),
                }
            })?;
            info!(kind = K::NAME, id = %encoded, state = %LifecycleState::Updating, ?changed, "Updating entity");
            self.client
                .update(&K::locate(&id), &request)
                .await
                .map_err(|source| ReconcileError::UpdateFailed {
                    kind: K::NAME,
                    id: encoded.clone(),
                    source,
                })?;
        }

        if K::TAGGABLE {
            self.sync_tags(&id, &config, store).await?;
        }

        Ok(self.observe(&id, store, false).await?.state())
    }

    /// Moves remote tags from the last observed set to the effective set.
    async fn sync_tags(
        &self,
        id: &K::Id,
        config: &K::Config,
        store: &mut dyn ConfigStore,
    ) -> ReconcileResult<()> {
        let encoded = id.encode();
        let observed = schema::tag_set(store, TAGS_ALL).map_err(|source| {
            ReconcileError::InvalidConfig {
                kind: K::NAME,
                operation: Operation::Update,
                source,
            }
        })?;
        let delta = self
            .tags
            .delta(&observed, &self.writable_tags(&K::declared_tags(config)));
        if delta.is_empty() {
            return Ok(());
        }

        let arn = self.resource_name(id, store).await?;
        let tag_failed = |source: RemoteError| ReconcileError::TagUpdateFailed {
            kind: K::NAME,
            resource: arn.clone(),
            source,
        };

        debug!(
            kind = K::NAME,
            id = %encoded,
            upsert = delta.upsert.len(),
            remove = delta.remove.len(),
            "Updating tags"
        );
        if !delta.remove.is_empty() {
            self.client
                .untag_resource(&arn, &delta.remove)
                .await
                .map_err(tag_failed)?;
        }
        if !delta.upsert.is_empty() {
            self.client
                .tag_resource(&arn, &delta.upsert)
                .await
                .map_err(tag_failed)?;
        }
        Ok(())
    }

    /// Resource name tags are addressed by: the recorded one if any,
    /// otherwise whatever the control plane reports.
    async fn resource_name(
        &self,
        id: &K::Id,
        store: &dyn ConfigStore,
    ) -> ReconcileResult<String> {
        let encoded = id.encode();
        let recorded = match K::ARN_FIELD {
            Some(field) => store
                .get(field)
                .and_then(|value| value.as_str().map(str::to_owned)),
            None => None,
        };
        if let Some(arn) = recorded {
            return Ok(arn);
        }

        let remote = self
            .client
            .describe(&K::locate(id))
            .await
            .map_err(|source| ReconcileError::ReadFailed {
                kind: K::NAME,
                id: encoded.clone(),
                source,
            })?;
        remote.arn.ok_or_else(|| ReconcileError::TagUpdateFailed {
            kind: K::NAME,
            resource: encoded.clone(),
            source: RemoteError::Unexpected(format!("{} has no resource name", remote.entity)),
        })
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Detaches the entity, deletes it and clears the identifier.
    ///
    /// A failed detach aborts before the delete call. Deleting something that
    /// is already gone succeeds.
    pub async fn delete(&self, store: &mut dyn ConfigStore) -> ReconcileResult<LifecycleState> {
        let Some(raw) = store.current_identifier() else {
            debug!(kind = K::NAME, "No identifier recorded, nothing to delete");
            return Ok(LifecycleState::Absent);
        };
        let id = K::Id::decode(&raw).map_err(|source| ReconcileError::MalformedIdentifier {
            operation: Operation::Delete,
            source,
        })?;
        let encoded = id.encode();
        info!(kind = K::NAME, id = %encoded, state = %LifecycleState::Deleting, "Deleting entity");

        if let Some(association) = K::association(&id) {
            match self.client.set_association(&association.target, &[]).await {
                Ok(()) => debug!(kind = K::NAME, id = %encoded, target = %association.target, "Detached"),
                Err(err) if err.is_owner_not_found() => {
                    debug!(kind = K::NAME, id = %encoded, "Owner already gone, nothing to detach");
                }
                Err(source) => {
                    return Err(ReconcileError::AssociationFailed {
                        kind: K::NAME,
                        id: encoded,
                        operation: Operation::Delete,
                        source,
                    });
                }
            }
        }

        match self.client.delete(&K::locate(&id)).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(kind = K::NAME, id = %encoded, "Entity already gone");
            }
            Err(source) => {
                return Err(ReconcileError::DeleteFailed {
                    kind: K::NAME,
                    id: encoded,
                    source,
                });
            }
        }

        store.set_identifier(None);
        info!(kind = K::NAME, id = %encoded, "Deleted entity");
        Ok(LifecycleState::Absent)
    }

    // ── Import ───────────────────────────────────────────────────

    /// Adopts an existing entity by identifier.
    pub async fn import(&self, id: &str, store: &mut dyn ConfigStore) -> ReconcileResult<K::Id> {
        let parsed = K::Id::decode(id).map_err(|source| ReconcileError::MalformedIdentifier {
            operation: Operation::Import,
            source,
        })?;
        let encoded = parsed.encode();
        store.set_identifier(Some(encoded.clone()));

        match self.observe(&parsed, store, false).await? {
            ReadOutcome::Active => {
                info!(kind = K::NAME, id = %encoded, "Imported entity");
                Ok(parsed)
            }
            ReadOutcome::Absent(cause) => {
                let source = match cause {
                    DriftCause::EntityNotFound => RemoteError::entity_not_found(&encoded),
                    DriftCause::OwnerNotFound => RemoteError::owner_not_found(&encoded),
                    DriftCause::AssociationMissing => {
                        RemoteError::Unexpected(format!("{encoded} is not attached"))
                    }
                };
                Err(ReconcileError::ReadFailed {
                    kind: K::NAME,
                    id: encoded,
                    source,
                })
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn tracked_id(store: &dyn ConfigStore, operation: Operation) -> ReconcileResult<K::Id> {
        let raw = store
            .current_identifier()
            .ok_or(ReconcileError::MissingIdentifier {
                kind: K::NAME,
                operation,
            })?;
        K::Id::decode(&raw)
            .map_err(|source| ReconcileError::MalformedIdentifier { operation, source })
    }

    /// Effective tags minus the ones that must never be written.
    fn writable_tags(&self, declared: &TagSet) -> TagSet {
        let mut tags = self.tags.effective(declared);
        tags.retain(|key, _| !self.tags.ignore.ignores(key));
        tags
    }
}
