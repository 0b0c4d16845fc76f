//! Maintenance window

use serde_json::{Map, Value};

use super::wire;
use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::schema::{AttrType, AttributeSpec, ResourceDescriptor};
use crate::traits::{Endpoint, Resource};

pub const KIND: &str = "maintenance";

const RECURRENCE: &[&str] = &["none", "day", "week", "month"];

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(KIND)
        .attribute(AttributeSpec::required("description", AttrType::String))
        .attribute(AttributeSpec::required("from", AttrType::Int))
        .attribute(AttributeSpec::required("to", AttrType::Int))
        .attribute(
            AttributeSpec::optional("recurrencetype", AttrType::String)
                .default_value("none")
                .one_of(RECURRENCE),
        )
        .attribute(AttributeSpec::optional("repeatevery", AttrType::Int).default_value(0))
        .attribute(AttributeSpec::computed("effectiveto", AttrType::Int))
        .attribute(AttributeSpec::optional("uptimeids", AttrType::IntSet))
        .attribute(AttributeSpec::optional("tmsids", AttrType::IntSet))
}

#[derive(Debug, Default)]
pub struct Maintenance;

impl Resource for Maintenance {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Maintenance
    }

    fn check_declared(&self, attrs: &Attributes) -> Result<()> {
        check_window(KIND, attrs)
    }

    fn to_wire(&self, attrs: &Attributes) -> Result<Value> {
        let mut out = Map::new();
        for name in ["description", "from", "to", "recurrencetype", "repeatevery"] {
            wire::copy(attrs, &mut out, name, name);
        }
        wire::join_ints(attrs, &mut out, "uptimeids", "uptimeids");
        wire::join_ints(attrs, &mut out, "tmsids", "tmsids");
        Ok(Value::Object(out))
    }

    fn from_wire(&self, body: &Value) -> Result<Attributes> {
        let mut attrs = Attributes::new()
            .with("description", wire::require_str(KIND, body, "description")?)
            .with("from", wire::require_int(KIND, body, "from")?)
            .with("to", wire::require_int(KIND, body, "to")?);
        for name in ["recurrencetype", "repeatevery", "effectiveto"] {
            wire::copy_back(body, &mut attrs, name, name);
        }

        // Reads group the attached checks by check family.
        match body.get("checks") {
            Some(checks) => {
                wire::ints_back(checks, &mut attrs, "uptime", "uptimeids");
                wire::ints_back(checks, &mut attrs, "tms", "tmsids");
            }
            None => {
                wire::ints_back(body, &mut attrs, "uptimeids", "uptimeids");
                wire::ints_back(body, &mut attrs, "tmsids", "tmsids");
            }
        }
        Ok(attrs)
    }
}

/// `to` must be strictly after `from`
pub(crate) fn check_window(kind: &str, attrs: &Attributes) -> Result<()> {
    if let (Some(from), Some(to)) = (attrs.get_i64("from"), attrs.get_i64("to")) {
        if to <= from {
            return Err(Error::validation(
                kind,
                format!("'to' ({}) must be after 'from' ({})", to, from),
            ));
        }
    }
    Ok(())
}
