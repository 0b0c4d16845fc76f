//! Alerting team

use serde_json::{Map, Value, json};

use super::wire;
use crate::attributes::Attributes;
use crate::error::Result;
use crate::schema::{AttrType, AttributeSpec, ResourceDescriptor};
use crate::traits::{Endpoint, Resource};

pub const KIND: &str = "team";

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(KIND)
        .attribute(AttributeSpec::required("name", AttrType::String))
        .attribute(AttributeSpec::optional("member_ids", AttrType::IntSet))
}

#[derive(Debug, Default)]
pub struct Team;

impl Resource for Team {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Teams
    }

    fn to_wire(&self, attrs: &Attributes) -> Result<Value> {
        let mut out = Map::new();
        wire::copy(attrs, &mut out, "name", "name");
        if attrs.has("member_ids") {
            out.insert("member_ids".to_string(), json!(attrs.get_int_set("member_ids")));
        }
        Ok(Value::Object(out))
    }

    fn from_wire(&self, body: &Value) -> Result<Attributes> {
        let mut attrs = Attributes::new().with("name", wire::require_str(KIND, body, "name")?);
        // Reads return member objects; writes echo the id list.
        if let Some(members) = body.get("members").or_else(|| body.get("member_ids")) {
            let ids = wire::split_ints(members);
            if !ids.is_empty() {
                attrs.set("member_ids", ids);
            }
        }
        Ok(attrs)
    }

    fn update_payload(&self, attrs: &Attributes, changed: &[&str]) -> Result<Value> {
        // The service rejects a team update without its name.
        let mut names = changed.to_vec();
        if !names.contains(&"name") {
            names.push("name");
        }
        self.to_wire(&attrs.subset(&names))
    }
}
