//! Alerting contact

use serde_json::{Map, Value};

use super::wire;
use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::schema::{AttrType, AttributeSpec, BlockSpec, ResourceDescriptor};
use crate::traits::{Endpoint, Resource};

pub const KIND: &str = "contact";

const SEVERITIES: &[&str] = &["HIGH", "LOW"];
const SMS_PROVIDERS: &[&str] = &["nexmo", "bulksms", "esendex", "cellsynt"];

pub(crate) fn email_block() -> ResourceDescriptor {
    ResourceDescriptor::new("contact.email_notification")
        .attribute(AttributeSpec::required("address", AttrType::String))
        .attribute(
            AttributeSpec::optional("severity", AttrType::String)
                .default_value("HIGH")
                .one_of(SEVERITIES),
        )
}

pub(crate) fn sms_block() -> ResourceDescriptor {
    ResourceDescriptor::new("contact.sms_notification")
        .attribute(AttributeSpec::required("number", AttrType::String))
        .attribute(AttributeSpec::optional("country_code", AttrType::String).default_value("1"))
        .attribute(
            AttributeSpec::optional("provider", AttrType::String)
                .default_value("nexmo")
                .one_of(SMS_PROVIDERS),
        )
        .attribute(
            AttributeSpec::optional("severity", AttrType::String)
                .default_value("HIGH")
                .one_of(SEVERITIES),
        )
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(KIND)
        .attribute(AttributeSpec::required("name", AttrType::String))
        .attribute(AttributeSpec::optional("paused", AttrType::Bool).default_value(false))
        .attribute(AttributeSpec::optional(
            "email_notification",
            AttrType::Block(BlockSpec::set(email_block())),
        ))
        .attribute(AttributeSpec::optional(
            "sms_notification",
            AttrType::Block(BlockSpec::set(sms_block())),
        ))
}

#[derive(Debug, Default)]
pub struct Contact;

impl Resource for Contact {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Contacts
    }

    fn check_declared(&self, attrs: &Attributes) -> Result<()> {
        if !attrs.has("email_notification") && !attrs.has("sms_notification") {
            return Err(Error::validation(
                KIND,
                "at least one email_notification or sms_notification is required",
            ));
        }
        Ok(())
    }

    fn to_wire(&self, attrs: &Attributes) -> Result<Value> {
        let mut out = Map::new();
        wire::copy(attrs, &mut out, "name", "name");
        wire::copy(attrs, &mut out, "paused", "paused");

        let mut targets = Map::new();
        wire::copy(attrs, &mut targets, "email_notification", "email");
        wire::copy(attrs, &mut targets, "sms_notification", "sms");
        if !targets.is_empty() {
            out.insert("notification_targets".to_string(), Value::Object(targets));
        }
        Ok(Value::Object(out))
    }

    fn from_wire(&self, body: &Value) -> Result<Attributes> {
        let mut attrs = Attributes::new().with("name", wire::require_str(KIND, body, "name")?);
        wire::copy_back(body, &mut attrs, "paused", "paused");
        if let Some(targets) = body.get("notification_targets") {
            wire::copy_back(targets, &mut attrs, "email", "email_notification");
            wire::copy_back(targets, &mut attrs, "sms", "sms_notification");
        }
        Ok(attrs)
    }

    fn update_payload(&self, attrs: &Attributes, _changed: &[&str]) -> Result<Value> {
        // Notification targets are replaced wholesale, and name is mandatory.
        self.to_wire(attrs)
    }
}
