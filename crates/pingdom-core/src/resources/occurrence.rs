//! Maintenance window occurrence
//!
//! Occurrences are generated by the service from their maintenance window;
//! they cannot be created directly. "Create" adopts the occurrence of
//! `maintenance_id` that starts at `effective_from` and moves it to
//! `from`/`to`. `effective_from` is never echoed by the service.

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::maintenance::check_window;
use super::wire;
use crate::attributes::Attributes;
use crate::error::Result;
use crate::schema::{AttrType, AttributeSpec, ResourceDescriptor};
use crate::traits::{ApiClient, ApiError, ApiResult, Endpoint, Resource};

pub const KIND: &str = "occurrence";

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(KIND)
        .attribute(AttributeSpec::required("maintenance_id", AttrType::Int).force_replace())
        .attribute(AttributeSpec::required("effective_from", AttrType::Int).force_replace())
        .attribute(AttributeSpec::required("from", AttrType::Int))
        .attribute(AttributeSpec::required("to", AttrType::Int))
}

#[derive(Debug, Default)]
pub struct Occurrence;

#[async_trait]
impl Resource for Occurrence {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Occurrences
    }

    fn check_declared(&self, attrs: &Attributes) -> Result<()> {
        check_window(KIND, attrs)
    }

    fn local_attributes(&self) -> &'static [&'static str] {
        &["effective_from"]
    }

    fn to_wire(&self, attrs: &Attributes) -> Result<Value> {
        let mut out = Map::new();
        wire::copy(attrs, &mut out, "maintenance_id", "maintenanceid");
        // Only consumed by create_remote to pick the occurrence.
        wire::copy(attrs, &mut out, "effective_from", "effective_from");
        wire::copy(attrs, &mut out, "from", "from");
        wire::copy(attrs, &mut out, "to", "to");
        Ok(Value::Object(out))
    }

    fn from_wire(&self, body: &Value) -> Result<Attributes> {
        Ok(Attributes::new()
            .with("maintenance_id", wire::require_int(KIND, body, "maintenanceid")?)
            .with("from", wire::require_int(KIND, body, "from")?)
            .with("to", wire::require_int(KIND, body, "to")?))
    }

    async fn create_remote(&self, client: &dyn ApiClient, payload: &Value) -> ApiResult<Value> {
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(wire::as_int)
                .ok_or_else(|| ApiError::failed(format!("occurrence payload missing '{}'", key)))
        };
        let maintenance_id = field("maintenanceid")?;
        let effective_from = field("effective_from")?;

        let occurrences = client
            .list(Endpoint::Occurrences, &[("maintenanceid", maintenance_id.to_string())])
            .await?;
        let adopted = occurrences
            .iter()
            .find(|occ| occ.get("from").and_then(wire::as_int) == Some(effective_from))
            .and_then(|occ| self.entity_id(occ))
            .ok_or_else(|| {
                ApiError::failed(format!(
                    "maintenance {} has no occurrence starting at {}",
                    maintenance_id, effective_from
                ))
            })?;
        tracing::debug!(
            "Adopting occurrence {} of maintenance {}",
            adopted,
            maintenance_id
        );

        let window = json!({ "from": field("from")?, "to": field("to")? });
        client.update(Endpoint::Occurrences, adopted, &window).await?;

        Ok(json!({
            "id": adopted,
            "maintenanceid": maintenance_id,
            "from": window["from"],
            "to": window["to"],
        }))
    }
}
