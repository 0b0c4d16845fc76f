//! Uptime check
//!
//! Writes are flat; reads nest the type-specific settings under the type
//! name (`"type": {"http": {"url": ...}}`) and return `hostname` instead of
//! `host`.

use serde_json::{Map, Value};

use super::wire;
use crate::attributes::Attributes;
use crate::error::Result;
use crate::schema::{AttrType, AttributeSpec, ResourceDescriptor};
use crate::traits::{Endpoint, Resource};

pub const KIND: &str = "check";

pub const CHECK_TYPES: &[&str] = &[
    "http",
    "httpcustom",
    "tcp",
    "ping",
    "dns",
    "udp",
    "smtp",
    "pop3",
    "imap",
];

// Attribute name and wire key are identical for these.
const PLAIN: &[&str] = &[
    "name",
    "type",
    "resolution",
    "paused",
    "url",
    "encryption",
    "port",
    "shouldcontain",
    "shouldnotcontain",
    "postdata",
    "verify_certificate",
    "ssl_down_days_before",
    "sendnotificationwhendown",
    "notifyagainevery",
    "notifywhenbackup",
    "responsetime_threshold",
];

const ID_SETS: &[&str] = &["userids", "teamids", "integrationids"];

pub fn descriptor() -> ResourceDescriptor {
    use AttrType::*;
    ResourceDescriptor::new(KIND)
        .attribute(AttributeSpec::required("name", String))
        .attribute(AttributeSpec::required("host", String))
        .attribute(
            AttributeSpec::required("type", String)
                .force_replace()
                .one_of(CHECK_TYPES),
        )
        .attribute(AttributeSpec::optional("resolution", Int).default_value(5))
        .attribute(AttributeSpec::optional("paused", Bool).default_value(false))
        .attribute(AttributeSpec::optional_computed("url", String))
        .attribute(AttributeSpec::optional_computed("encryption", Bool))
        .attribute(AttributeSpec::optional_computed("port", Int))
        .attribute(AttributeSpec::optional("shouldcontain", String))
        .attribute(AttributeSpec::optional("shouldnotcontain", String))
        .attribute(AttributeSpec::optional("postdata", String))
        .attribute(AttributeSpec::optional_computed("verify_certificate", Bool))
        .attribute(AttributeSpec::optional_computed("ssl_down_days_before", Int))
        .attribute(AttributeSpec::optional("sendnotificationwhendown", Int).default_value(2))
        .attribute(AttributeSpec::optional("notifyagainevery", Int).default_value(0))
        .attribute(AttributeSpec::optional("notifywhenbackup", Bool).default_value(true))
        .attribute(AttributeSpec::optional("responsetime_threshold", Int).default_value(30000))
        .attribute(AttributeSpec::optional("tags", StringSet))
        .attribute(AttributeSpec::optional("probefilters", StringSet))
        .attribute(AttributeSpec::optional("userids", IntSet))
        .attribute(AttributeSpec::optional("teamids", IntSet))
        .attribute(AttributeSpec::optional("integrationids", IntSet))
}

#[derive(Debug, Default)]
pub struct Check;

impl Resource for Check {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Checks
    }

    fn to_wire(&self, attrs: &Attributes) -> Result<Value> {
        let mut out = Map::new();
        for name in PLAIN {
            wire::copy(attrs, &mut out, name, name);
        }
        wire::copy(attrs, &mut out, "host", "host");
        wire::join_strs(attrs, &mut out, "tags", "tags");
        wire::join_strs(attrs, &mut out, "probefilters", "probe_filters");
        for name in ID_SETS {
            wire::join_ints(attrs, &mut out, name, name);
        }
        Ok(Value::Object(out))
    }

    fn from_wire(&self, body: &Value) -> Result<Attributes> {
        let mut attrs = Attributes::new();
        attrs.set("name", wire::require_str(KIND, body, "name")?);

        let host = body
            .get("hostname")
            .or_else(|| body.get("host"))
            .and_then(Value::as_str);
        if let Some(host) = host {
            attrs.set("host", host);
        }

        let mut detail = Value::Null;
        match body.get("type") {
            Some(Value::String(ty)) => attrs.set("type", ty.as_str()),
            Some(Value::Object(by_type)) => {
                if let Some((ty, settings)) = by_type.iter().next() {
                    attrs.set("type", ty.as_str());
                    detail = settings.clone();
                }
            }
            _ => {}
        }

        for name in PLAIN.iter().filter(|n| !matches!(**n, "name" | "type")) {
            wire::copy_back(&detail, &mut attrs, name, name);
            if !attrs.has(name) {
                wire::copy_back(body, &mut attrs, name, name);
            }
        }
        if !attrs.has("paused") {
            if let Some(status) = body.get("status").and_then(Value::as_str) {
                attrs.set("paused", status == "paused");
            }
        }

        wire::strs_back(body, &mut attrs, "tags", "tags");
        wire::strs_back(body, &mut attrs, "probe_filters", "probefilters");
        for name in ID_SETS {
            wire::ints_back(body, &mut attrs, name, name);
        }
        Ok(attrs)
    }
}
