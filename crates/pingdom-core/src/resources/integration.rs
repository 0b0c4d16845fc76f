//! Alert integration (webhook, librato)
//!
//! Integrations live on the extended API and are reconciled with the
//! org-scoped secondary client.

use serde_json::{Map, Value, json};

use super::wire;
use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::schema::{AttrType, AttributeSpec, BlockSpec, ResourceDescriptor};
use crate::traits::{ClientTarget, Endpoint, Resource};

pub const KIND: &str = "integration";

/// Provider name → numeric provider id used on the wire
const PROVIDERS: &[(&str, i64)] = &[("webhook", 2), ("librato", 3)];
const PROVIDER_NAMES: &[&str] = &["webhook", "librato"];

pub(crate) fn settings_block() -> ResourceDescriptor {
    ResourceDescriptor::new("integration.provider_settings")
        .attribute(AttributeSpec::required("name", AttrType::String))
        .attribute(AttributeSpec::optional("url", AttrType::String))
        .attribute(AttributeSpec::optional("email", AttrType::String))
        .attribute(AttributeSpec::optional("api_token", AttrType::String))
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(KIND)
        .attribute(
            AttributeSpec::required("provider_name", AttrType::String)
                .force_replace()
                .one_of(PROVIDER_NAMES),
        )
        .attribute(AttributeSpec::required("active", AttrType::Bool))
        .attribute(AttributeSpec::required(
            "provider_settings",
            AttrType::Block(BlockSpec::single(settings_block())),
        ))
}

pub(crate) fn provider_id(name: &str) -> Option<i64> {
    PROVIDERS.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
}

pub(crate) fn provider_name(id: i64) -> Option<&'static str> {
    PROVIDERS.iter().find(|(_, i)| *i == id).map(|(n, _)| *n)
}

#[derive(Debug, Default)]
pub struct Integration;

impl Resource for Integration {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn target(&self) -> ClientTarget {
        ClientTarget::Secondary
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Integrations
    }

    fn check_declared(&self, attrs: &Attributes) -> Result<()> {
        let settings = attrs.get_block("provider_settings").unwrap_or_default();
        let required: &[&str] = match attrs.get_str("provider_name") {
            Some("webhook") => &["url"],
            Some("librato") => &["email", "api_token"],
            _ => &[],
        };
        for field in required {
            if !settings.has(field) {
                return Err(Error::validation(
                    KIND,
                    format!(
                        "provider_settings.{} is required for provider '{}'",
                        field,
                        attrs.get_str("provider_name").unwrap_or_default()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn to_wire(&self, attrs: &Attributes) -> Result<Value> {
        let mut out = Map::new();
        if let Some(name) = attrs.get_str("provider_name") {
            let id = provider_id(name).ok_or_else(|| {
                Error::validation(KIND, format!("unsupported provider '{}'", name))
            })?;
            out.insert("providerId".to_string(), json!(id));
        }
        wire::copy(attrs, &mut out, "active", "active");
        if let Some(settings) = attrs.get_block("provider_settings") {
            out.insert("userData".to_string(), settings.into_value());
        }
        Ok(Value::Object(out))
    }

    fn from_wire(&self, body: &Value) -> Result<Attributes> {
        let mut attrs = Attributes::new();

        let by_id = body
            .get("providerId")
            .or_else(|| body.get("provider_id"))
            .and_then(wire::as_int)
            .and_then(provider_name);
        let by_name = body.get("provider_name").and_then(Value::as_str);
        match by_id.or(by_name) {
            Some(name) => attrs.set("provider_name", name.to_lowercase()),
            None => {
                return Err(Error::remote(
                    KIND,
                    self.entity_id(body),
                    "malformed response: unknown provider",
                ));
            }
        }

        wire::copy_back(body, &mut attrs, "active", "active");
        if let Some(settings) = body.get("userData").or_else(|| body.get("user_data")) {
            attrs.set("provider_settings", Value::Array(vec![settings.clone()]));
        }
        Ok(attrs)
    }

    fn update_payload(&self, attrs: &Attributes, _changed: &[&str]) -> Result<Value> {
        self.to_wire(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook() -> Attributes {
        Attributes::new()
            .with("provider_name", "webhook")
            .with("active", true)
            .with("provider_settings", json!({ "name": "hook", "url": "https://example.com/hook" }))
    }

    #[test]
    fn uses_secondary_client() {
        assert_eq!(Integration.target(), ClientTarget::Secondary);
    }

    #[test]
    fn webhook_wire_shape() {
        let attrs = descriptor().validate(&webhook()).unwrap();
        let payload = Integration.to_wire(&attrs).unwrap();
        assert_eq!(
            payload,
            json!({
                "providerId": 2,
                "active": true,
                "userData": { "name": "hook", "url": "https://example.com/hook" }
            })
        );
    }

    #[test]
    fn reads_provider_by_name() {
        let body = json!({
            "id": 3,
            "provider_name": "Webhook",
            "active": false,
            "user_data": { "name": "hook", "url": "https://example.com/hook" }
        });
        let attrs = Integration.from_wire(&body).unwrap();
        assert_eq!(attrs.get_str("provider_name"), Some("webhook"));
        assert_eq!(attrs.get_bool("active"), Some(false));
        assert!(attrs.get_block("provider_settings").is_some());
    }

    #[test]
    fn librato_needs_credentials() {
        let attrs = Attributes::new()
            .with("provider_name", "librato")
            .with("active", true)
            .with("provider_settings", json!({ "name": "metrics", "email": "a@example.com" }));
        let attrs = descriptor().validate(&attrs).unwrap();
        let err = Integration.check_declared(&attrs).unwrap_err();
        assert!(err.to_string().contains("api_token"));
    }
}
