//! One converge pass over a manifest
//!
//! For every declared resource, in manifest order:
//!
//! ```text
//! state record? ──no──► create
//!      │yes
//!      ▼
//!    read ──NotFound──► create
//!      │Found
//!      ▼
//!   update (no-op / in place / replace)
//! ```
//!
//! Recorded resources that are no longer declared are deleted. Lookups are
//! resolved last. A failure on one resource is logged and counted; the pass
//! carries on with the next one. Configuration errors abort the pass.

use anyhow::Result;
use pingdom_core::traits::{LookupResult, StateRecord};
use pingdom_core::{Engine, Error, Plan, ReadOutcome, Reconciled, StateStore};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::manifest::{DeclaredResource, Manifest};

/// What one pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} replaced, {} unchanged, {} deleted, {} failed",
            self.created, self.updated, self.replaced, self.unchanged, self.deleted, self.failed
        )
    }
}

/// Result of a pass: counters plus everything that resolved
#[derive(Debug, Default)]
pub struct Outcome {
    pub summary: Summary,
    pub lookups: BTreeMap<String, LookupResult>,
}

enum Change {
    Created,
    Updated,
    Replaced,
    Unchanged,
}

/// Converge every resource of `manifest` once
pub async fn converge(
    engine: &Engine,
    store: &dyn StateStore,
    manifest: &Manifest,
) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    for declared in &manifest.resources {
        match reconcile(engine, store, declared).await {
            Ok(change) => match change {
                Change::Created => outcome.summary.created += 1,
                Change::Updated => outcome.summary.updated += 1,
                Change::Replaced => outcome.summary.replaced += 1,
                Change::Unchanged => outcome.summary.unchanged += 1,
            },
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                error!("{}: {}", declared.address, e);
                outcome.summary.failed += 1;
            }
        }
    }

    for address in store.list_records().await? {
        if manifest.declares(&address) {
            continue;
        }
        let Some(record) = store.get_record(&address).await? else {
            continue;
        };
        match engine.delete(&record.kind, record.id).await {
            Ok(_) => {
                store.delete_record(&address).await?;
                info!("{}: deleted {} {}", address, record.kind, record.id);
                outcome.summary.deleted += 1;
            }
            Err(e) => {
                error!("{}: {}", address, e);
                outcome.summary.failed += 1;
            }
        }
    }

    for declared in &manifest.lookups {
        let address = declared.address();
        match engine.lookup(&declared.kind, &declared.filter).await {
            Ok(result) => {
                outcome.lookups.insert(address, result);
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                error!("{}: {}", address, e);
                outcome.summary.failed += 1;
            }
        }
    }

    store.flush().await?;
    Ok(outcome)
}

async fn reconcile(
    engine: &Engine,
    store: &dyn StateStore,
    declared: &DeclaredResource,
) -> std::result::Result<Change, Error> {
    let address = declared.address.as_str();
    let kind = declared.kind.as_str();

    let prior = match store.get_record(address).await? {
        Some(record) if record.kind != kind => {
            warn!(
                "{}: kind changed from {} to {}, replacing",
                address, record.kind, kind
            );
            engine.delete(&record.kind, record.id).await?;
            store.delete_record(address).await?;
            None
        }
        other => other,
    };

    let Some(prior) = prior else {
        let created = create(engine, store, declared).await?;
        info!("{}: created {} {}", address, kind, created.id);
        return Ok(Change::Created);
    };

    let observed = match engine.read(kind, prior.id, Some(&prior.attributes)).await? {
        ReadOutcome::Found(observed) => observed,
        ReadOutcome::NotFound => {
            warn!("{}: {} {} was deleted remotely, re-creating", address, kind, prior.id);
            store.delete_record(address).await?;
            create(engine, store, declared).await?;
            return Ok(Change::Created);
        }
    };

    let change = match engine.plan(kind, Some(&observed.attributes), &declared.attributes)? {
        Plan::NoOp | Plan::Create => Change::Unchanged,
        Plan::UpdateInPlace { .. } => Change::Updated,
        Plan::Replace { .. } => Change::Replaced,
    };

    let reconciled = engine
        .update(kind, observed.id, &observed.attributes, &declared.attributes)
        .await;
    let reconciled = match reconciled {
        Ok(reconciled) => reconciled,
        // A replacement may already have deleted the old entity.
        Err(e) if matches!(change, Change::Replaced) => {
            match e.entity_id() {
                // The delete failed; the old entity is still there.
                Some(id) if id == observed.id => {}
                Some(id) => remember_partial(store, declared, id).await?,
                None => store.delete_record(address).await?,
            }
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    remember(store, declared, &reconciled).await?;
    Ok(change)
}

async fn create(
    engine: &Engine,
    store: &dyn StateStore,
    declared: &DeclaredResource,
) -> std::result::Result<Reconciled, Error> {
    match engine.create(&declared.kind, &declared.attributes).await {
        Ok(created) => {
            remember(store, declared, &created).await?;
            Ok(created)
        }
        Err(e) => {
            // Keep the id of an entity that exists remotely so the next run
            // reads it instead of creating a duplicate.
            if let Some(id) = e.entity_id() {
                remember_partial(store, declared, id).await?;
            }
            Err(e)
        }
    }
}

async fn remember(
    store: &dyn StateStore,
    declared: &DeclaredResource,
    reconciled: &Reconciled,
) -> std::result::Result<(), Error> {
    let record = StateRecord::new(&declared.kind, reconciled.id, reconciled.attributes.clone());
    store.set_record(&declared.address, &record).await
}

async fn remember_partial(
    store: &dyn StateStore,
    declared: &DeclaredResource,
    id: u64,
) -> std::result::Result<(), Error> {
    warn!("{}: remembering {} {} for the next run", declared.address, declared.kind, id);
    let record = StateRecord::new(&declared.kind, id, declared.attributes.clone());
    store.set_record(&declared.address, &record).await
}

/// Resolved state as printed after a pass
pub async fn render(
    store: &dyn StateStore,
    lookups: &BTreeMap<String, LookupResult>,
) -> Result<Value> {
    let mut resources = Map::new();
    for address in store.list_records().await? {
        if let Some(record) = store.get_record(&address).await? {
            resources.insert(
                address,
                json!({
                    "kind": record.kind,
                    "id": record.id,
                    "attributes": record.attributes,
                    "last_reconciled": record.last_reconciled.to_rfc3339(),
                }),
            );
        }
    }

    let lookups: Map<String, Value> = lookups
        .iter()
        .map(|(address, result)| {
            (
                address.clone(),
                json!({ "id": result.id, "attributes": result.attributes }),
            )
        })
        .collect();

    Ok(json!({ "resources": resources, "lookups": lookups }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pingdom_core::traits::{ApiClient, ApiError, ApiResult, Endpoint};
    use pingdom_core::{ClientBundle, EngineConfig, MemoryStateStore};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Minimal in-memory service
    #[derive(Default)]
    struct FakeService {
        entities: Mutex<HashMap<(Endpoint, u64), Value>>,
        next_id: AtomicU64,
    }

    #[async_trait]
    impl ApiClient for FakeService {
        async fn list(&self, endpoint: Endpoint, _: &[(&str, String)]) -> ApiResult<Vec<Value>> {
            let entities = self.entities.lock().unwrap();
            let mut items: Vec<_> = entities
                .iter()
                .filter(|((e, _), _)| *e == endpoint)
                .map(|((_, id), v)| (*id, v.clone()))
                .collect();
            items.sort_by_key(|(id, _)| *id);
            Ok(items.into_iter().map(|(_, v)| v).collect())
        }
        async fn get(&self, endpoint: Endpoint, id: u64) -> ApiResult<Value> {
            self.entities
                .lock()
                .unwrap()
                .get(&(endpoint, id))
                .cloned()
                .ok_or(ApiError::NotFound)
        }
        async fn create(&self, endpoint: Endpoint, payload: &Value) -> ApiResult<Value> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let mut entity = payload.clone();
            entity["id"] = json!(id);
            self.entities.lock().unwrap().insert((endpoint, id), entity.clone());
            Ok(entity)
        }
        async fn update(&self, endpoint: Endpoint, id: u64, payload: &Value) -> ApiResult<Value> {
            let mut entities = self.entities.lock().unwrap();
            let entity = entities.get_mut(&(endpoint, id)).ok_or(ApiError::NotFound)?;
            if let (Some(target), Some(fields)) = (entity.as_object_mut(), payload.as_object()) {
                target.extend(fields.clone());
            }
            Ok(entity.clone())
        }
        async fn delete(&self, endpoint: Endpoint, id: u64) -> ApiResult<()> {
            self.entities
                .lock()
                .unwrap()
                .remove(&(endpoint, id))
                .map(|_| ())
                .ok_or(ApiError::NotFound)
        }
        fn client_name(&self) -> &'static str {
            "fake"
        }
    }

    fn engine(service: &Arc<FakeService>) -> Engine {
        let clients = Arc::new(ClientBundle::new(service.clone(), None));
        let (engine, _rx) = Engine::builtin(clients, &EngineConfig::default()).unwrap();
        engine
    }

    fn manifest(json: &str) -> Manifest {
        Manifest::parse(json).unwrap()
    }

    const TEAM: &str = r#"{
        "resources": [
            {
                "address": "team.sre",
                "kind": "team",
                "attributes": { "name": "SRE", "member_ids": [2, 1] }
            }
        ],
        "lookups": [ { "kind": "teams" } ]
    }"#;

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let service = Arc::new(FakeService::default());
        let engine = engine(&service);
        let store = MemoryStateStore::new();

        let first = converge(&engine, &store, &manifest(TEAM)).await.unwrap();
        assert_eq!(first.summary.created, 1);
        assert_eq!(first.lookups["data.teams"].attributes.get("names"), Some(&json!(["SRE"])));

        let second = converge(&engine, &store, &manifest(TEAM)).await.unwrap();
        assert_eq!(
            second.summary,
            Summary {
                unchanged: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn remote_deletion_is_re_created() {
        let service = Arc::new(FakeService::default());
        let engine = engine(&service);
        let store = MemoryStateStore::new();

        converge(&engine, &store, &manifest(TEAM)).await.unwrap();
        service.entities.lock().unwrap().clear();

        let outcome = converge(&engine, &store, &manifest(TEAM)).await.unwrap();
        assert_eq!(outcome.summary.created, 1);
        let record = store.get_record("team.sre").await.unwrap().unwrap();
        assert_eq!(record.id, 2);
    }

    #[tokio::test]
    async fn undeclared_resources_are_deleted() {
        let service = Arc::new(FakeService::default());
        let engine = engine(&service);
        let store = MemoryStateStore::new();

        converge(&engine, &store, &manifest(TEAM)).await.unwrap();
        let outcome = converge(&engine, &store, &manifest("{}")).await.unwrap();

        assert_eq!(outcome.summary.deleted, 1);
        assert!(store.list_records().await.unwrap().is_empty());
        assert!(service.entities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn changed_attributes_update_in_place() {
        let service = Arc::new(FakeService::default());
        let engine = engine(&service);
        let store = MemoryStateStore::new();

        converge(&engine, &store, &manifest(TEAM)).await.unwrap();
        let renamed = TEAM.replace("\"SRE\"", "\"Site Reliability\"");
        let outcome = converge(&engine, &store, &manifest(&renamed)).await.unwrap();

        assert_eq!(outcome.summary.updated, 1);
        let record = store.get_record("team.sre").await.unwrap().unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.attributes.get_str("name"), Some("Site Reliability"));
    }

    #[tokio::test]
    async fn invalid_resource_is_counted_and_skipped() {
        let service = Arc::new(FakeService::default());
        let engine = engine(&service);
        let store = MemoryStateStore::new();

        let outcome = converge(
            &engine,
            &store,
            &manifest(
                r#"{
                    "resources": [
                        {
                            "address": "team.bad",
                            "kind": "team",
                            "attributes": { "colour": "red" }
                        },
                        { "address": "team.ok", "kind": "team", "attributes": { "name": "Ok" } }
                    ]
                }"#,
            ),
        )
        .await
        .unwrap();

        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.summary.created, 1);
        assert!(!outcome.summary.is_success());
    }

    #[tokio::test]
    async fn secondary_kind_without_credentials_aborts() {
        let service = Arc::new(FakeService::default());
        let engine = engine(&service);
        let store = MemoryStateStore::new();

        let result = converge(
            &engine,
            &store,
            &manifest(r#"{ "lookups": [ { "kind": "integrations" } ] }"#),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn render_lists_resources_and_lookups() {
        let service = Arc::new(FakeService::default());
        let engine = engine(&service);
        let store = MemoryStateStore::new();

        let outcome = converge(&engine, &store, &manifest(TEAM)).await.unwrap();
        let rendered = render(&store, &outcome.lookups).await.unwrap();

        assert_eq!(rendered["resources"]["team.sre"]["kind"], "team");
        assert_eq!(rendered["resources"]["team.sre"]["attributes"]["member_ids"], json!([1, 2]));
        assert_eq!(rendered["lookups"]["data.teams"]["id"], "teams");
    }
}
