//! Built-in lookups ("data sources")
//!
//! Singular lookups (`team`, `contact`, `integration`) list the collection
//! and pick the entity whose name matches the `name` filter exactly. The
//! first match wins; zero matches is [`Error::NotFound`] naming the filter.
//! The identity is the entity's numeric id, stringified.
//!
//! Plural lookups (`teams`, `contacts`, `integrations`) take no filter and
//! return `ids` and `names` in the order the service lists them. That order
//! is not a stable contract across calls.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::resources::{self, contact, integration};
use crate::schema::{AttrType, AttributeSpec, BlockSpec, ResourceDescriptor};
use crate::traits::{ApiClient, ClientTarget, Endpoint, Lookup, LookupResult, Resource};

/// Descriptors of every built-in lookup kind
pub fn descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new("team")
            .attribute(AttributeSpec::required("name", AttrType::String))
            .attribute(AttributeSpec::computed("member_ids", AttrType::IntSet)),
        ResourceDescriptor::new("contact")
            .attribute(AttributeSpec::required("name", AttrType::String))
            .attribute(AttributeSpec::computed("paused", AttrType::Bool))
            .attribute(AttributeSpec::computed(
                "email_notification",
                AttrType::Block(BlockSpec::set(contact::email_block())),
            ))
            .attribute(AttributeSpec::computed(
                "sms_notification",
                AttrType::Block(BlockSpec::set(contact::sms_block())),
            )),
        ResourceDescriptor::new("integration")
            .attribute(AttributeSpec::required("name", AttrType::String))
            .attribute(AttributeSpec::computed("provider_name", AttrType::String))
            .attribute(AttributeSpec::computed("active", AttrType::Bool))
            .attribute(AttributeSpec::computed(
                "provider_settings",
                AttrType::Block(BlockSpec::single(integration::settings_block())),
            )),
        listing("teams"),
        listing("contacts"),
        listing("integrations"),
    ]
}

fn listing(kind: &'static str) -> ResourceDescriptor {
    ResourceDescriptor::new(kind)
        .attribute(AttributeSpec::computed("ids", AttrType::IntList))
        .attribute(AttributeSpec::computed("names", AttrType::StringList))
}

/// Every built-in lookup
pub fn builtin() -> Vec<Arc<dyn Lookup>> {
    vec![
        Arc::new(ByName::new("team", Arc::new(resources::Team))),
        Arc::new(ByName::new("contact", Arc::new(resources::Contact))),
        Arc::new(ByName::new("integration", Arc::new(resources::Integration))),
        Arc::new(Listing::new("teams", Endpoint::Teams, ClientTarget::Primary)),
        Arc::new(Listing::new("contacts", Endpoint::Contacts, ClientTarget::Primary)),
        Arc::new(Listing::new("integrations", Endpoint::Integrations, ClientTarget::Secondary)),
    ]
}

/// Name of a listed entity; integrations keep theirs in the user data
fn entity_name(entity: &Value) -> Option<&str> {
    entity
        .get("name")
        .or_else(|| entity.get("userData").and_then(|d| d.get("name")))
        .or_else(|| entity.get("user_data").and_then(|d| d.get("name")))
        .and_then(Value::as_str)
}

/// Exact-match lookup by `name`, translated with the kind's resource
pub struct ByName {
    kind: &'static str,
    resource: Arc<dyn Resource>,
}

impl ByName {
    pub fn new(kind: &'static str, resource: Arc<dyn Resource>) -> Self {
        Self { kind, resource }
    }
}

#[async_trait]
impl Lookup for ByName {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn target(&self) -> ClientTarget {
        self.resource.target()
    }

    async fn lookup(&self, client: &dyn ApiClient, filter: &Attributes) -> Result<LookupResult> {
        let name = filter
            .get_str("name")
            .ok_or_else(|| Error::validation(self.kind, "missing required attribute 'name'"))?;

        let entities = client
            .list(self.resource.endpoint(), &[])
            .await
            .map_err(|e| Error::from_api(self.kind, None, e))?;
        tracing::debug!("{}: {} candidates listed", self.kind, entities.len());

        let mut matches = entities.iter().filter(|e| entity_name(e) == Some(name));
        let found = matches
            .next()
            .ok_or_else(|| Error::not_found(self.kind, format!("name = \"{}\"", name)))?;
        if matches.next().is_some() {
            tracing::warn!("{}: several entities named \"{}\", using the first", self.kind, name);
        }

        let id = self.resource.entity_id(found).ok_or_else(|| {
            Error::remote(self.kind, None, "malformed response: missing field 'id'")
        })?;

        let mut attributes = self.resource.from_wire(found)?;
        attributes.set("name", name);
        Ok(LookupResult {
            id: id.to_string(),
            attributes,
        })
    }
}

/// Unfiltered listing of a collection's ids and names
pub struct Listing {
    kind: &'static str,
    endpoint: Endpoint,
    target: ClientTarget,
}

impl Listing {
    pub fn new(kind: &'static str, endpoint: Endpoint, target: ClientTarget) -> Self {
        Self {
            kind,
            endpoint,
            target,
        }
    }
}

#[async_trait]
impl Lookup for Listing {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn target(&self) -> ClientTarget {
        self.target
    }

    async fn lookup(&self, client: &dyn ApiClient, _filter: &Attributes) -> Result<LookupResult> {
        let entities = client
            .list(self.endpoint, &[])
            .await
            .map_err(|e| Error::from_api(self.kind, None, e))?;

        let mut ids = Vec::with_capacity(entities.len());
        let mut names = Vec::with_capacity(entities.len());
        for entity in &entities {
            let Some(id) = entity.get("id").and_then(Value::as_u64) else {
                tracing::warn!("{}: skipping entity without id", self.kind);
                continue;
            };
            ids.push(id);
            names.push(entity_name(entity).unwrap_or_default().to_string());
        }

        Ok(LookupResult {
            id: self.kind.to_string(),
            attributes: Attributes::new().with("ids", ids).with("names", names),
        })
    }
}
