//! Transaction (synthetic) check

use serde_json::{Map, Value, json};

use super::wire;
use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::schema::{AttrType, AttributeSpec, BlockSpec, ResourceDescriptor};
use crate::traits::{Endpoint, Resource};

pub const KIND: &str = "tms_check";

const REGIONS: &[&str] = &["us-east", "us-west", "eu", "au"];
const INTERVALS: &[i64] = &[5, 10, 20, 60, 720, 1440];
const STEP_ARGS: &[&str] = &[
    "url", "element", "value", "checkbox", "option", "form", "input", "seconds",
];

fn args_block() -> ResourceDescriptor {
    STEP_ARGS.iter().fold(
        ResourceDescriptor::new("tms_check.steps.args"),
        |descriptor, name| descriptor.attribute(AttributeSpec::optional(*name, AttrType::String)),
    )
}

fn step_block() -> ResourceDescriptor {
    ResourceDescriptor::new("tms_check.steps")
        .attribute(AttributeSpec::required("fn", AttrType::String))
        .attribute(AttributeSpec::optional(
            "args",
            AttrType::Block(BlockSpec::single(args_block())),
        ))
}

pub fn descriptor() -> ResourceDescriptor {
    use AttrType::*;
    ResourceDescriptor::new(KIND)
        .attribute(AttributeSpec::required("name", String))
        .attribute(AttributeSpec::required(
            "steps",
            Block(BlockSpec::list(step_block()).min_items(1)),
        ))
        .attribute(AttributeSpec::optional("active", Bool).default_value(true))
        .attribute(AttributeSpec::optional("interval", Int).default_value(10))
        .attribute(
            AttributeSpec::optional("region", String)
                .default_value("us-east")
                .one_of(REGIONS),
        )
        .attribute(AttributeSpec::optional("send_notification_when_down", Int).default_value(1))
        .attribute(
            AttributeSpec::optional("severity_level", String)
                .default_value("high")
                .one_of(&["high", "low"]),
        )
        .attribute(AttributeSpec::optional("custom_message", String))
        .attribute(AttributeSpec::optional("contact_ids", IntSet))
        .attribute(AttributeSpec::optional("team_ids", IntSet))
        .attribute(AttributeSpec::optional("integration_ids", IntSet))
        .attribute(AttributeSpec::optional("tags", StringSet))
}

const PLAIN: &[&str] = &[
    "name",
    "active",
    "interval",
    "region",
    "send_notification_when_down",
    "severity_level",
    "custom_message",
    "contact_ids",
    "team_ids",
    "integration_ids",
    "tags",
];

#[derive(Debug, Default)]
pub struct TmsCheck;

impl Resource for TmsCheck {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::TmsChecks
    }

    fn check_declared(&self, attrs: &Attributes) -> Result<()> {
        if let Some(interval) = attrs.get_i64("interval") {
            if !INTERVALS.contains(&interval) {
                return Err(Error::validation(
                    KIND,
                    format!("interval must be one of {:?} minutes, got {}", INTERVALS, interval),
                ));
            }
        }
        Ok(())
    }

    fn to_wire(&self, attrs: &Attributes) -> Result<Value> {
        let mut out = Map::new();
        for name in PLAIN {
            wire::copy(attrs, &mut out, name, name);
        }
        if attrs.has("steps") {
            // The service takes `args` as a plain object.
            let steps: Vec<Value> = attrs
                .get_blocks("steps")
                .into_iter()
                .map(|step| {
                    let mut obj = Map::new();
                    wire::copy(&step, &mut obj, "fn", "fn");
                    obj.insert(
                        "args".to_string(),
                        step.get_block("args")
                            .map(Attributes::into_value)
                            .unwrap_or_else(|| json!({})),
                    );
                    Value::Object(obj)
                })
                .collect();
            out.insert("steps".to_string(), Value::Array(steps));
        }
        Ok(Value::Object(out))
    }

    fn from_wire(&self, body: &Value) -> Result<Attributes> {
        let mut attrs = Attributes::new();
        attrs.set("name", wire::require_str(KIND, body, "name")?);
        for name in PLAIN.iter().skip(1) {
            wire::copy_back(body, &mut attrs, name, name);
        }

        if let Some(steps) = body.get("steps").and_then(Value::as_array) {
            let steps: Vec<Value> = steps
                .iter()
                .map(|step| {
                    let mut obj = Map::new();
                    if let Some(f) = step.get("fn") {
                        obj.insert("fn".to_string(), f.clone());
                    }
                    match step.get("args") {
                        Some(args) if args.as_object().is_some_and(|a| !a.is_empty()) => {
                            obj.insert("args".to_string(), Value::Array(vec![args.clone()]));
                        }
                        _ => {}
                    }
                    Value::Object(obj)
                })
                .collect();
            attrs.set("steps", steps);
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> Attributes {
        Attributes::new().with("name", "login").with(
            "steps",
            json!([
                { "fn": "go_to", "args": { "url": "https://example.com" } },
                { "fn": "click", "args": [{ "element": "#submit" }] },
                { "fn": "wait_for_element" }
            ]),
        )
    }

    #[test]
    fn steps_keep_order_and_args_flatten_on_the_wire() {
        let attrs = descriptor().validate(&declared()).unwrap();
        let payload = TmsCheck.to_wire(&attrs).unwrap();
        assert_eq!(
            payload["steps"][0],
            json!({ "fn": "go_to", "args": { "url": "https://example.com" } })
        );
        assert_eq!(payload["steps"][1]["args"], json!({ "element": "#submit" }));
        assert_eq!(payload["steps"][2]["args"], json!({}));
        assert_eq!(payload["region"], "us-east");
    }

    #[test]
    fn wire_round_trip_is_lossless() {
        let attrs = descriptor().validate(&declared()).unwrap();
        let payload = TmsCheck.to_wire(&attrs).unwrap();
        let back = descriptor()
            .canonicalize(&TmsCheck.from_wire(&payload).unwrap())
            .unwrap();
        assert_eq!(back, attrs);
    }

    #[test]
    fn steps_required() {
        let attrs = Attributes::new()
            .with("name", "login")
            .with("steps", json!([]));
        assert!(descriptor().validate(&attrs).is_err());
    }

    #[test]
    fn rejects_unsupported_interval() {
        let attrs = descriptor().validate(&declared().with("interval", 7)).unwrap();
        assert!(TmsCheck.check_declared(&attrs).is_err());
    }
}
