//! Per-kind reconciler interface
//!
//! A [`Resource`] owns everything specific to one resource kind: which
//! client and collection it talks to, and how declared attributes translate
//! to and from the wire shape. The CRUD flow itself (validation, diffing,
//! replace-versus-update, error mapping) lives in
//! [`Engine`](crate::engine::Engine) and is shared by every kind.
//!
//! The remote hooks default to the plain collection calls; kinds whose
//! lifecycle does not map onto them (occurrences) override the hooks.

use async_trait::async_trait;
use serde_json::Value;

use super::api_client::{ApiClient, ApiResult, ClientTarget, Endpoint};
use crate::attributes::Attributes;
use crate::error::Result;

#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource kind name (e.g. "check")
    fn kind(&self) -> &'static str;

    /// Client this kind is reconciled with
    fn target(&self) -> ClientTarget {
        ClientTarget::Primary
    }

    /// Remote collection
    fn endpoint(&self) -> Endpoint;

    /// Cross-attribute checks the descriptor cannot express
    ///
    /// Runs on descriptor-validated attributes, before any remote call.
    fn check_declared(&self, _attrs: &Attributes) -> Result<()> {
        Ok(())
    }

    /// Translate validated attributes into a create payload
    ///
    /// Must only emit fields for attributes that are present, so the same
    /// translation serves partial updates.
    fn to_wire(&self, attrs: &Attributes) -> Result<Value>;

    /// Translate a remote entity into declared-attribute shape
    fn from_wire(&self, wire: &Value) -> Result<Attributes>;

    /// Partial update payload covering only `changed` attributes
    fn update_payload(&self, attrs: &Attributes, changed: &[&str]) -> Result<Value> {
        self.to_wire(&attrs.subset(changed))
    }

    /// Attributes the service never echoes back
    ///
    /// Their last declared value is carried over after every read.
    fn local_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Numeric identity of a remote entity
    fn entity_id(&self, wire: &Value) -> Option<u64> {
        wire.get("id").and_then(Value::as_u64)
    }

    /// Remote create
    async fn create_remote(&self, client: &dyn ApiClient, payload: &Value) -> ApiResult<Value> {
        client.create(self.endpoint(), payload).await
    }

    /// Remote read by id
    async fn read_remote(&self, client: &dyn ApiClient, id: u64) -> ApiResult<Value> {
        client.get(self.endpoint(), id).await
    }

    /// Remote partial update
    async fn update_remote(
        &self,
        client: &dyn ApiClient,
        id: u64,
        payload: &Value,
    ) -> ApiResult<Value> {
        client.update(self.endpoint(), id, payload).await
    }

    /// Remote delete
    async fn delete_remote(&self, client: &dyn ApiClient, id: u64) -> ApiResult<()> {
        client.delete(self.endpoint(), id).await
    }
}
