//! Test doubles and common utilities for contract tests
//!
//! The doubles keep entities in memory and count every call, so tests can
//! assert exactly which remote operations an engine operation issued.

#![allow(dead_code)]

use async_trait::async_trait;
use pingdom_core::config::{PrimaryCredentials, SecondaryCredentials};
use pingdom_core::engine::{Engine, ReconcileEvent};
use pingdom_core::traits::{ApiClient, ApiClientFactory, ApiError, ApiResult, Endpoint};
use pingdom_core::{ClientBundle, EngineConfig, Error};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Remote operation, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// In-memory ApiClient that tracks calls
///
/// Entities are stored as the JSON objects they were created with plus an
/// `id`; updates merge the payload's fields. Lists return entities in
/// insertion order.
pub struct MockApiClient {
    name: &'static str,
    collections: Mutex<HashMap<Endpoint, Vec<Value>>>,
    next_id: AtomicU64,
    calls: Mutex<HashMap<Op, usize>>,
    /// One-shot failures, consumed by the next call of that operation
    failures: Mutex<HashMap<Op, ApiError>>,
    /// Payloads of create and update calls, in call order
    payloads: Mutex<Vec<(Op, Value)>>,
    /// Every call, in call order
    log: Mutex<Vec<Op>>,
    total_calls: AtomicUsize,
}

impl MockApiClient {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            collections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(100),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            payloads: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            total_calls: AtomicUsize::new(0),
        }
    }

    /// Put an entity in place without counting a call; returns its id
    pub fn seed(&self, endpoint: Endpoint, entity: Value) -> u64 {
        let mut entity = entity;
        let id = match entity.get("id").and_then(Value::as_u64) {
            Some(id) => id,
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                entity["id"] = Value::from(id);
                id
            }
        };
        self.collections
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push(entity);
        id
    }

    /// Stored entity, without counting a call
    pub fn stored(&self, endpoint: Endpoint, id: u64) -> Option<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(&endpoint)
            .and_then(|items| items.iter().find(|e| id_of(e) == Some(id)).cloned())
    }

    /// Remove an entity behind the engine's back
    pub fn remove(&self, endpoint: Endpoint, id: u64) {
        if let Some(items) = self.collections.lock().unwrap().get_mut(&endpoint) {
            items.retain(|e| id_of(e) != Some(id));
        }
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: Op, error: ApiError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    /// Number of calls of `op` so far
    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Number of calls of any operation so far
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Payload of the most recent call of `op`
    pub fn last_payload(&self, op: Op) -> Option<Value> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(o, _)| *o == op)
            .map(|(_, p)| p.clone())
    }

    /// Operations issued since the last reset, in call order
    pub fn call_log(&self) -> Vec<Op> {
        self.log.lock().unwrap().clone()
    }

    /// Reset call counters
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
        self.log.lock().unwrap().clear();
        self.total_calls.store(0, Ordering::SeqCst);
    }

    fn record(&self, op: Op) -> ApiResult<()> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        self.log.lock().unwrap().push(op);
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn id_of(entity: &Value) -> Option<u64> {
    entity.get("id").and_then(Value::as_u64)
}

fn matches_query(entity: &Value, query: &[(&str, String)]) -> bool {
    query.iter().all(|(key, expected)| {
        entity.get(*key).is_some_and(|v| match v {
            Value::String(s) => s == expected,
            other => other.to_string() == *expected,
        })
    })
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn list(&self, endpoint: Endpoint, query: &[(&str, String)]) -> ApiResult<Vec<Value>> {
        self.record(Op::List)?;
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(&endpoint)
            .map(|items| {
                items
                    .iter()
                    .filter(|e| matches_query(e, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, endpoint: Endpoint, id: u64) -> ApiResult<Value> {
        self.record(Op::Get)?;
        self.stored(endpoint, id).ok_or(ApiError::NotFound)
    }

    async fn create(&self, endpoint: Endpoint, payload: &Value) -> ApiResult<Value> {
        self.record(Op::Create)?;
        self.payloads.lock().unwrap().push((Op::Create, payload.clone()));
        let mut entity = payload.clone();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        entity["id"] = Value::from(id);
        self.collections
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, endpoint: Endpoint, id: u64, payload: &Value) -> ApiResult<Value> {
        self.record(Op::Update)?;
        self.payloads.lock().unwrap().push((Op::Update, payload.clone()));
        let mut collections = self.collections.lock().unwrap();
        let entity = collections
            .get_mut(&endpoint)
            .and_then(|items| items.iter_mut().find(|e| id_of(e) == Some(id)))
            .ok_or(ApiError::NotFound)?;
        let fields: Map<String, Value> = payload.as_object().cloned().unwrap_or_default();
        if let Some(obj) = entity.as_object_mut() {
            obj.extend(fields);
        }
        Ok(entity.clone())
    }

    async fn delete(&self, endpoint: Endpoint, id: u64) -> ApiResult<()> {
        self.record(Op::Delete)?;
        let mut collections = self.collections.lock().unwrap();
        let items = collections.get_mut(&endpoint).ok_or(ApiError::NotFound)?;
        let before = items.len();
        items.retain(|e| id_of(e) != Some(id));
        if items.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    fn client_name(&self) -> &'static str {
        self.name
    }
}

/// ApiClientFactory handing out shared mock clients
pub struct MockClientFactory {
    pub primary: Arc<MockApiClient>,
    pub secondary: Arc<MockApiClient>,
    pub fail_secondary: bool,
    pub primary_builds: AtomicUsize,
    pub secondary_builds: AtomicUsize,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self {
            primary: Arc::new(MockApiClient::new("mock-primary")),
            secondary: Arc::new(MockApiClient::new("mock-secondary")),
            fail_secondary: false,
            primary_builds: AtomicUsize::new(0),
            secondary_builds: AtomicUsize::new(0),
        }
    }
}

impl ApiClientFactory for MockClientFactory {
    fn create_primary(
        &self,
        credentials: &PrimaryCredentials,
    ) -> Result<Arc<dyn ApiClient>, Error> {
        self.primary_builds.fetch_add(1, Ordering::SeqCst);
        credentials
            .bearer_token()
            .ok_or_else(|| Error::client_init("api_token or api_token_only is required"))?;
        Ok(self.primary.clone())
    }

    fn create_secondary(&self, _: &SecondaryCredentials) -> Result<Arc<dyn ApiClient>, Error> {
        self.secondary_builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_secondary {
            return Err(Error::client_init("secondary credentials rejected"));
        }
        Ok(self.secondary.clone())
    }
}

/// Engine over the built-in kinds backed by mock clients
pub fn mock_engine(
    primary: &Arc<MockApiClient>,
    secondary: Option<&Arc<MockApiClient>>,
) -> (Engine, mpsc::Receiver<ReconcileEvent>) {
    let primary: Arc<dyn ApiClient> = primary.clone();
    let secondary = secondary.map(|s| s.clone() as Arc<dyn ApiClient>);
    let clients = Arc::new(ClientBundle::new(primary, secondary));
    Engine::builtin(clients, &EngineConfig::default()).expect("engine construction succeeds")
}

/// Drain every event currently queued
pub fn drain(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
