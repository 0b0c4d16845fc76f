//! Reconciliation engine
//!
//! The Engine is responsible for:
//! - Validating declared attributes against the kind's descriptor
//! - Picking the client (primary or secondary) the kind needs
//! - Running the shared Create/Read/Update/Delete flow
//! - Deciding between an in-place update and a replacement
//! - Resolving lookups
//!
//! ## Architecture
//!
//! ```text
//!   declared attributes
//!          │
//!          ▼
//! ┌──────────────────┐      ┌──────────────────┐
//! │  SchemaRegistry  │      │ ResourceRegistry │
//! │ (validate, diff) │      │ (per-kind wire)  │
//! └──────────────────┘      └──────────────────┘
//!          │                         │
//!          └───────────┬─────────────┘
//!                      ▼
//!               ┌─────────────┐        ┌──────────────┐
//!               │   Engine    │──────► │ ClientBundle │
//!               └─────────────┘        └──────────────┘
//!                      │
//!                      ▼
//!          observed attributes + id, events
//! ```
//!
//! ## Entity lifecycle
//!
//! ```text
//! absent → creating → present → updating → present → deleting → absent
//!              └──────────┴───────────┴────────────────┴──► errored
//! ```
//!
//! Every transition is emitted as a [`ReconcileEvent`].
//!
//! Each operation awaits its remote calls one after another and never
//! retries. Dropping the returned future cancels the in-flight call.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::attributes::Attributes;
use crate::client::ClientBundle;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::registry::ResourceRegistry;
use crate::schema::{AttributeDiff, ResourceDescriptor, SchemaRegistry};
use crate::traits::{ApiError, LookupResult, Resource};

/// Lifecycle state of one remote entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
    Errored,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityState::Absent => "absent",
            EntityState::Creating => "creating",
            EntityState::Present => "present",
            EntityState::Updating => "updating",
            EntityState::Deleting => "deleting",
            EntityState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Events emitted by the Engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// An entity moved between lifecycle states
    Transition {
        kind: String,
        id: Option<u64>,
        from: EntityState,
        to: EntityState,
    },

    /// An operation failed; the entity is now errored
    Failed {
        kind: String,
        id: Option<u64>,
        from: EntityState,
        error: String,
    },

    /// A previously known entity no longer exists remotely
    Vanished { kind: String, id: u64 },

    /// A lookup resolved
    LookupResolved { kind: String, id: String },

    /// A lookup failed
    LookupFailed { kind: String, error: String },
}

/// What reconciling declared attributes against prior state would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// No prior state; the entity is created
    Create,
    /// Nothing changed
    NoOp,
    /// Only mutable attributes changed; one partial update
    UpdateInPlace { changed: Vec<&'static str> },
    /// A force-replace attribute changed; delete then create
    Replace { changed: Vec<&'static str> },
}

/// Successful reconciliation: identity plus observed attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub id: u64,
    pub attributes: Attributes,
}

/// Outcome of a read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(Reconciled),
    /// The entity no longer exists; the caller should re-create it
    NotFound,
}

/// Outcome of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

/// Resource reconciliation engine
///
/// Cheap to clone; every clone shares the registries, the client bundle and
/// the event channel. Safe to drive from several tasks at once as long as no
/// two of them target the same entity id.
#[derive(Clone)]
pub struct Engine {
    /// Descriptor tables
    schemas: Arc<SchemaRegistry>,

    /// Per-kind reconcilers
    registry: Arc<ResourceRegistry>,

    /// Authenticated clients for this session
    clients: Arc<ClientBundle>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Engine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields reconcile events
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        registry: Arc<ResourceRegistry>,
        clients: Arc<ClientBundle>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            schemas,
            registry,
            clients,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Engine over every built-in kind
    pub fn builtin(
        clients: Arc<ClientBundle>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        Self::new(
            Arc::new(SchemaRegistry::builtin()),
            Arc::new(ResourceRegistry::builtin()),
            clients,
            config,
        )
    }

    /// Descriptor tables in use
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Validate declared attributes for `kind`
    ///
    /// Returns the normalised attributes (defaults applied, sets in canonical
    /// order). No remote call is made.
    pub fn validate(&self, kind: &str, declared: &Attributes) -> Result<Attributes> {
        let (resource, descriptor) = self.resolve(kind)?;
        let normalized = descriptor.validate(declared)?;
        resource.check_declared(&normalized)?;
        Ok(normalized)
    }

    /// Decide what reconciling `desired` against `prior` would do
    pub fn plan(
        &self,
        kind: &str,
        prior: Option<&Attributes>,
        desired: &Attributes,
    ) -> Result<Plan> {
        let desired = self.validate(kind, desired)?;
        let Some(prior) = prior else {
            return Ok(Plan::Create);
        };

        let diff = self.schemas.resource(kind)?.diff(prior, &desired)?;
        Ok(plan_for(&diff))
    }

    /// Create a remote entity from declared attributes
    ///
    /// On success the entity has been confirmed with a fresh read. If the
    /// create succeeded but the confirmation read failed, the error is
    /// [`Error::PartialCreate`] carrying the new id.
    pub async fn create(&self, kind: &str, declared: &Attributes) -> Result<Reconciled> {
        let (resource, descriptor) = self.resolve(kind)?;
        let normalized = descriptor.validate(declared)?;
        resource.check_declared(&normalized)?;
        let client = self.clients.for_target(resource.target(), kind)?;

        self.transition(kind, None, EntityState::Absent, EntityState::Creating);

        let payload = resource.to_wire(&normalized)?;
        debug!("Creating {}: {}", kind, payload);

        let created = match resource.create_remote(client.as_ref(), &payload).await {
            Ok(created) => created,
            Err(e) => {
                let err = Error::from_api(kind, None, e);
                return Err(self.fail(kind, None, EntityState::Creating, err));
            }
        };

        let Some(id) = resource.entity_id(&created) else {
            let err = Error::remote(kind, None, "create response carried no id");
            return Err(self.fail(kind, None, EntityState::Creating, err));
        };

        let confirmed = match resource.read_remote(client.as_ref(), id).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                let err = Error::PartialCreate {
                    kind: kind.to_string(),
                    id,
                    message: e.to_string(),
                };
                return Err(self.fail(kind, Some(id), EntityState::Creating, err));
            }
        };

        let observed = observe(resource.as_ref(), descriptor, &confirmed, Some(&normalized));
        let attributes = match observed {
            Ok(attributes) => attributes,
            Err(e) => return Err(self.fail(kind, Some(id), EntityState::Creating, e)),
        };

        info!("Created {} {}", kind, id);
        self.transition(kind, Some(id), EntityState::Creating, EntityState::Present);
        Ok(Reconciled { id, attributes })
    }

    /// Read the current remote state of an entity
    ///
    /// A missing entity is [`ReadOutcome::NotFound`], not an error.
    /// Attributes the service never echoes are carried over from `prior`.
    pub async fn read(
        &self,
        kind: &str,
        id: u64,
        prior: Option<&Attributes>,
    ) -> Result<ReadOutcome> {
        let (resource, descriptor) = self.resolve(kind)?;
        let client = self.clients.for_target(resource.target(), kind)?;

        match resource.read_remote(client.as_ref(), id).await {
            Ok(wire) => {
                let attributes = observe(resource.as_ref(), descriptor, &wire, prior)?;
                debug!("Read {} {}", kind, id);
                Ok(ReadOutcome::Found(Reconciled { id, attributes }))
            }
            Err(ApiError::NotFound) => {
                warn!("{} {} no longer exists remotely", kind, id);
                self.emit_event(ReconcileEvent::Vanished {
                    kind: kind.to_string(),
                    id,
                });
                Ok(ReadOutcome::NotFound)
            }
            Err(e) => Err(Error::from_api(kind, Some(id), e)),
        }
    }

    /// Move an entity from `old` to `new` declared attributes
    ///
    /// - no change: no remote call
    /// - only mutable attributes changed: one partial update, then a read
    /// - a force-replace attribute changed: delete, then create
    ///
    /// The returned id differs from `id` after a replacement.
    pub async fn update(
        &self,
        kind: &str,
        id: u64,
        old: &Attributes,
        new: &Attributes,
    ) -> Result<Reconciled> {
        let (resource, descriptor) = self.resolve(kind)?;
        let normalized = descriptor.validate(new)?;
        resource.check_declared(&normalized)?;

        let diff = descriptor.diff(old, &normalized)?;
        match plan_for(&diff) {
            Plan::NoOp | Plan::Create => {
                debug!("{} {} unchanged", kind, id);
                let mut attributes = descriptor.canonicalize(old)?;
                carry_local(resource.as_ref(), &mut attributes, Some(old));
                Ok(Reconciled { id, attributes })
            }
            Plan::Replace { changed } => {
                info!("Replacing {} {} (changed: {})", kind, id, changed.join(", "));
                self.delete(kind, id).await?;
                self.create(kind, &normalized).await
            }
            Plan::UpdateInPlace { changed } => {
                let payload = update_payload(resource.as_ref(), descriptor, &normalized, &diff)?;
                if is_empty_payload(&payload) {
                    debug!("{} {} has nothing to send for: {}", kind, id, changed.join(", "));
                    let mut attributes = descriptor.canonicalize(old)?;
                    carry_local(resource.as_ref(), &mut attributes, Some(old));
                    return Ok(Reconciled { id, attributes });
                }
                self.update_in_place(
                    resource.as_ref(),
                    descriptor,
                    id,
                    &normalized,
                    &payload,
                    &changed,
                )
                .await
            }
        }
    }

    async fn update_in_place(
        &self,
        resource: &dyn Resource,
        descriptor: &ResourceDescriptor,
        id: u64,
        normalized: &Attributes,
        payload: &Value,
        changed: &[&'static str],
    ) -> Result<Reconciled> {
        let kind = resource.kind();
        let client = self.clients.for_target(resource.target(), kind)?;

        self.transition(kind, Some(id), EntityState::Present, EntityState::Updating);
        debug!("Updating {} {}: {}", kind, id, payload);

        if let Err(e) = resource.update_remote(client.as_ref(), id, payload).await {
            let err = Error::from_api(kind, Some(id), e);
            return Err(self.fail(kind, Some(id), EntityState::Updating, err));
        }

        let wire = match resource.read_remote(client.as_ref(), id).await {
            Ok(wire) => wire,
            Err(e) => {
                let err = Error::from_api(kind, Some(id), e);
                return Err(self.fail(kind, Some(id), EntityState::Updating, err));
            }
        };
        let attributes = match observe(resource, descriptor, &wire, Some(normalized)) {
            Ok(attributes) => attributes,
            Err(e) => return Err(self.fail(kind, Some(id), EntityState::Updating, e)),
        };

        info!("Updated {} {} (changed: {})", kind, id, changed.join(", "));
        self.transition(kind, Some(id), EntityState::Updating, EntityState::Present);
        Ok(Reconciled { id, attributes })
    }

    /// Delete a remote entity
    ///
    /// Deleting an entity that is already gone succeeds.
    pub async fn delete(&self, kind: &str, id: u64) -> Result<DeleteOutcome> {
        let (resource, _) = self.resolve(kind)?;
        let client = self.clients.for_target(resource.target(), kind)?;

        self.transition(kind, Some(id), EntityState::Present, EntityState::Deleting);

        let outcome = match resource.delete_remote(client.as_ref(), id).await {
            Ok(()) => {
                info!("Deleted {} {}", kind, id);
                DeleteOutcome::Deleted
            }
            Err(ApiError::NotFound) => {
                debug!("{} {} already absent", kind, id);
                DeleteOutcome::AlreadyAbsent
            }
            Err(e) => {
                let err = Error::from_api(kind, Some(id), e);
                return Err(self.fail(kind, Some(id), EntityState::Deleting, err));
            }
        };

        self.transition(kind, Some(id), EntityState::Deleting, EntityState::Absent);
        Ok(outcome)
    }

    /// Resolve a lookup ("data source")
    pub async fn lookup(&self, kind: &str, filter: &Attributes) -> Result<LookupResult> {
        let lookup = self.registry.lookup(kind)?;
        let descriptor = self.schemas.data_source(kind)?;
        let filter = descriptor.validate(filter)?;
        let client = self.clients.for_target(lookup.target(), kind)?;

        let resolved = match lookup.lookup(client.as_ref(), &filter).await {
            Ok(result) => descriptor
                .canonicalize(&result.attributes)
                .map(|attributes| LookupResult {
                    id: result.id,
                    attributes,
                }),
            Err(e) => Err(e),
        };

        match resolved {
            Ok(result) => {
                debug!("Lookup {} resolved to {}", kind, result.id);
                self.emit_event(ReconcileEvent::LookupResolved {
                    kind: kind.to_string(),
                    id: result.id.clone(),
                });
                Ok(result)
            }
            Err(e) => {
                warn!("Lookup {} failed: {}", kind, e);
                self.emit_event(ReconcileEvent::LookupFailed {
                    kind: kind.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn resolve(&self, kind: &str) -> Result<(Arc<dyn Resource>, &ResourceDescriptor)> {
        let resource = self.registry.resource(kind)?;
        let descriptor = self.schemas.resource(kind)?;
        Ok((resource, descriptor.as_ref()))
    }

    fn transition(&self, kind: &str, id: Option<u64>, from: EntityState, to: EntityState) {
        self.emit_event(ReconcileEvent::Transition {
            kind: kind.to_string(),
            id,
            from,
            to,
        });
    }

    fn fail(&self, kind: &str, id: Option<u64>, from: EntityState, err: Error) -> Error {
        let id_text = id.map(|i| i.to_string()).unwrap_or_default();
        warn!("{} {} failed while {}: {}", kind, id_text, from, err);
        self.emit_event(ReconcileEvent::Failed {
            kind: kind.to_string(),
            id,
            from,
            error: err.to_string(),
        });
        err
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            // Event processing is slower than reconciliation.
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "Event channel full, dropping event. \
                     Consider increasing event_channel_capacity."
                );
            }
            // Nobody is listening.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("clients", &self.clients)
            .finish()
    }
}

fn plan_for(diff: &AttributeDiff) -> Plan {
    if diff.is_empty() {
        Plan::NoOp
    } else if diff.requires_replace() {
        Plan::Replace {
            changed: diff.changed_names(),
        }
    } else {
        Plan::UpdateInPlace {
            changed: diff.changed_names(),
        }
    }
}

/// Build the partial update for `diff`
///
/// Removed collections are sent empty so the service clears them.
fn update_payload(
    resource: &dyn Resource,
    descriptor: &ResourceDescriptor,
    normalized: &Attributes,
    diff: &AttributeDiff,
) -> Result<Value> {
    let mut outgoing = normalized.clone();
    for change in diff.changes.iter().filter(|c| c.new.is_none()) {
        if descriptor
            .spec(change.name)
            .is_some_and(|s| s.ty.is_collection())
        {
            outgoing.set(change.name, Value::Array(Vec::new()));
        }
    }
    resource.update_payload(&outgoing, &diff.changed_names())
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Translate a remote entity and put it in canonical form
fn observe(
    resource: &dyn Resource,
    descriptor: &ResourceDescriptor,
    wire: &Value,
    carry_from: Option<&Attributes>,
) -> Result<Attributes> {
    let mut attributes = descriptor.canonicalize(&resource.from_wire(wire)?)?;
    carry_local(resource, &mut attributes, carry_from);
    Ok(attributes)
}

fn carry_local(resource: &dyn Resource, attributes: &mut Attributes, from: Option<&Attributes>) {
    let Some(from) = from else { return };
    for name in resource.local_attributes() {
        if let Some(value) = from.get(name) {
            attributes.set(*name, value.clone());
        }
    }
}
