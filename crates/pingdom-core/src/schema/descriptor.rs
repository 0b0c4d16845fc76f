//! Resource descriptors
//!
//! A [`ResourceDescriptor`] is the static, ordered attribute table of one
//! resource kind (or of one nested block). It drives three things:
//!
//! - validation and normalisation of declared attributes before any remote call
//! - canonicalisation of attributes read back from the service
//! - the update diff, including which changes force a replacement
//!
//! Set-valued attributes are canonicalised (sorted, deduplicated) so that
//! element order never shows up as a difference.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::attributes::Attributes;
use crate::error::{Error, Result};

/// Semantic type of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttrType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// Unordered set of integers
    IntSet,
    /// Unordered set of strings
    StringSet,
    /// Ordered list of integers
    IntList,
    /// Ordered list of strings
    StringList,
    /// Nested block(s) validated against their own descriptor
    Block(BlockSpec),
}

impl AttrType {
    /// Sets, lists and blocks
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            AttrType::IntSet
                | AttrType::StringSet
                | AttrType::IntList
                | AttrType::StringList
                | AttrType::Block(_)
        )
    }
}

/// Nested block definition
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    /// Attribute table of each block
    pub schema: Box<ResourceDescriptor>,
    /// Whether block order is significant
    pub mode: BlockMode,
    /// Minimum number of blocks when the attribute is present
    pub min_items: usize,
    /// Maximum number of blocks
    pub max_items: Option<usize>,
}

impl BlockSpec {
    /// Ordered list of blocks
    pub fn list(schema: ResourceDescriptor) -> Self {
        Self {
            schema: Box::new(schema),
            mode: BlockMode::List,
            min_items: 0,
            max_items: None,
        }
    }

    /// Unordered set of blocks
    pub fn set(schema: ResourceDescriptor) -> Self {
        Self {
            mode: BlockMode::Set,
            ..Self::list(schema)
        }
    }

    /// Exactly one block
    pub fn single(schema: ResourceDescriptor) -> Self {
        Self {
            min_items: 1,
            max_items: Some(1),
            ..Self::list(schema)
        }
    }

    /// Require at least `n` blocks
    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = n;
        self
    }
}

/// Ordering semantics of a block attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    /// Order is significant
    List,
    /// Order is not significant
    Set,
}

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be declared
    Required,
    /// May be declared
    Optional,
    /// Supplied by the service only
    Computed,
    /// May be declared; the service supplies it otherwise
    OptionalComputed,
}

/// How a change to an attribute is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// Updated in place with a partial update call
    InPlace,
    /// Requires destroy-then-recreate
    ForceReplace,
}

/// One attribute of a descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    /// Attribute name
    pub name: &'static str,
    /// Semantic type
    pub ty: AttrType,
    /// Presence rule
    pub presence: Presence,
    /// Mutability rule
    pub mutability: Mutability,
    /// Value applied when an optional attribute is omitted
    pub default: Option<Value>,
    /// Allowed values for string attributes
    pub one_of: Option<&'static [&'static str]>,
}

impl AttributeSpec {
    fn new(name: &'static str, ty: AttrType, presence: Presence) -> Self {
        Self {
            name,
            ty,
            presence,
            mutability: Mutability::InPlace,
            default: None,
            one_of: None,
        }
    }

    /// Required attribute
    pub fn required(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Required)
    }

    /// Optional attribute
    pub fn optional(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Optional)
    }

    /// Service-computed attribute
    pub fn computed(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Computed)
    }

    /// Optional attribute filled in by the service when omitted
    pub fn optional_computed(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::OptionalComputed)
    }

    /// Mark the attribute as force-replace
    pub fn force_replace(mut self) -> Self {
        self.mutability = Mutability::ForceReplace;
        self
    }

    /// Default applied when the attribute is omitted
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict a string attribute to a fixed set of values
    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = Some(values);
        self
    }

    /// Whether callers may declare this attribute
    pub fn is_settable(&self) -> bool {
        self.presence != Presence::Computed
    }
}

/// Static attribute table for one resource kind or nested block
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    kind: &'static str,
    attributes: Vec<AttributeSpec>,
}

/// A single attribute difference between two attribute maps
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    /// Attribute name
    pub name: &'static str,
    /// Previous value (canonical form)
    pub old: Option<Value>,
    /// New value (canonical form)
    pub new: Option<Value>,
    /// Whether the change requires destroy-then-recreate
    pub force_replace: bool,
}

/// Result of diffing two attribute maps against a descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeDiff {
    /// Changed attributes, in descriptor order
    pub changes: Vec<AttributeChange>,
}

impl AttributeDiff {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Whether any change requires destroy-then-recreate
    pub fn requires_replace(&self) -> bool {
        self.changes.iter().any(|c| c.force_replace)
    }

    /// Names of changed attributes
    pub fn changed_names(&self) -> Vec<&'static str> {
        self.changes.iter().map(|c| c.name).collect()
    }
}

impl ResourceDescriptor {
    /// Create an empty descriptor
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
        }
    }

    /// Append an attribute
    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    /// Kind (or block path) this descriptor describes
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Attribute specs in declaration order
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    /// Look up one attribute spec
    pub fn spec(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validate declared attributes and apply defaults
    ///
    /// Rejects unknown attributes, missing required attributes, declared
    /// computed attributes and ill-typed values. Returns the normalised map:
    /// sets sorted and deduplicated, defaults filled in, nested blocks
    /// validated recursively.
    pub fn validate(&self, declared: &Attributes) -> Result<Attributes> {
        for name in declared.names() {
            if self.spec(name).is_none() && declared.has(name) {
                return Err(Error::validation(
                    self.kind,
                    format!("unknown attribute '{}'", name),
                ));
            }
        }

        let mut normalized = Attributes::new();
        for spec in &self.attributes {
            match declared.get(spec.name) {
                Some(_) if spec.presence == Presence::Computed => {
                    return Err(Error::validation(
                        self.kind,
                        format!("attribute '{}' is computed and cannot be set", spec.name),
                    ));
                }
                Some(value) => {
                    let value = self.normalize_value(spec, value, true)?;
                    if !is_empty_collection(&value) {
                        normalized.set(spec.name, value);
                    }
                }
                None => match spec.presence {
                    Presence::Required => {
                        return Err(Error::validation(
                            self.kind,
                            format!("missing required attribute '{}'", spec.name),
                        ));
                    }
                    Presence::Optional | Presence::OptionalComputed => {
                        if let Some(default) = &spec.default {
                            let value = self.normalize_value(spec, default, true)?;
                            normalized.set(spec.name, value);
                        }
                    }
                    Presence::Computed => {}
                },
            }
        }

        Ok(normalized)
    }

    /// Canonicalise attributes read back from the service
    ///
    /// Lenient counterpart of [`validate`](Self::validate): presence rules are
    /// not enforced and unknown attributes are dropped, but values are still
    /// type-checked and sets are put in canonical order.
    pub fn canonicalize(&self, attrs: &Attributes) -> Result<Attributes> {
        let mut out = Attributes::new();
        for spec in &self.attributes {
            if let Some(value) = attrs.get(spec.name) {
                let value = self.normalize_value(spec, value, false)?;
                if !is_empty_collection(&value) {
                    out.set(spec.name, value);
                }
            }
        }
        Ok(out)
    }

    /// Diff two attribute maps
    ///
    /// Computed attributes never produce a change. An optional-computed
    /// attribute that is absent from `new` keeps whatever the service holds,
    /// and so does an optional scalar: the service has no way to unset one.
    /// A removed collection is still a change and is cleared on update.
    pub fn diff(&self, old: &Attributes, new: &Attributes) -> Result<AttributeDiff> {
        let old = self.canonicalize(old)?;
        let new = self.canonicalize(new)?;

        let mut changes = Vec::new();
        for spec in &self.attributes {
            match spec.presence {
                Presence::Computed => continue,
                Presence::OptionalComputed if !new.has(spec.name) => continue,
                Presence::Optional if !new.has(spec.name) && !spec.ty.is_collection() => continue,
                _ => {}
            }

            let before = old.get(spec.name).cloned();
            let after = new.get(spec.name).cloned();
            if before != after {
                changes.push(AttributeChange {
                    name: spec.name,
                    old: before,
                    new: after,
                    force_replace: spec.mutability == Mutability::ForceReplace,
                });
            }
        }

        Ok(AttributeDiff { changes })
    }

    fn normalize_value(&self, spec: &AttributeSpec, value: &Value, strict: bool) -> Result<Value> {
        let type_error = |expected: &str| {
            Error::validation(
                self.kind,
                format!("attribute '{}' must be {}, got {}", spec.name, expected, value),
            )
        };

        match &spec.ty {
            AttrType::String => {
                let s = value.as_str().ok_or_else(|| type_error("a string"))?;
                if let Some(allowed) = spec.one_of {
                    if strict && !allowed.contains(&s) {
                        return Err(Error::validation(
                            self.kind,
                            format!(
                                "attribute '{}' must be one of [{}], got '{}'",
                                spec.name,
                                allowed.join(", "),
                                s
                            ),
                        ));
                    }
                }
                Ok(value.clone())
            }
            AttrType::Int => value
                .as_i64()
                .map(Value::from)
                .ok_or_else(|| type_error("an integer")),
            AttrType::Bool => value
                .as_bool()
                .map(Value::from)
                .ok_or_else(|| type_error("a boolean")),
            AttrType::IntSet => {
                let items = value.as_array().ok_or_else(|| type_error("a set of integers"))?;
                let mut ints = items
                    .iter()
                    .map(|v| v.as_i64().ok_or_else(|| type_error("a set of integers")))
                    .collect::<Result<Vec<_>>>()?;
                ints.sort_unstable();
                ints.dedup();
                Ok(Value::from(ints))
            }
            AttrType::StringSet => {
                let items = value.as_array().ok_or_else(|| type_error("a set of strings"))?;
                let mut strings = items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| type_error("a set of strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                strings.sort();
                strings.dedup();
                Ok(Value::from(strings))
            }
            AttrType::IntList => {
                let items = value.as_array().ok_or_else(|| type_error("a list of integers"))?;
                items
                    .iter()
                    .map(|v| {
                        v.as_i64()
                            .map(Value::from)
                            .ok_or_else(|| type_error("a list of integers"))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            AttrType::StringList => {
                let items = value.as_array().ok_or_else(|| type_error("a list of strings"))?;
                if items.iter().all(Value::is_string) {
                    Ok(value.clone())
                } else {
                    Err(type_error("a list of strings"))
                }
            }
            AttrType::Block(block) => self.normalize_blocks(spec, block, value, strict),
        }
    }

    fn normalize_blocks(
        &self,
        spec: &AttributeSpec,
        block: &BlockSpec,
        value: &Value,
        strict: bool,
    ) -> Result<Value> {
        // A single object is accepted wherever a one-element block list is.
        let items: Vec<&Map<String, Value>> = match value {
            Value::Object(obj) => vec![obj],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        Error::validation(
                            self.kind,
                            format!("attribute '{}' must contain blocks, got {}", spec.name, item),
                        )
                    })
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(Error::validation(
                    self.kind,
                    format!("attribute '{}' must be a block, got {}", spec.name, other),
                ));
            }
        };

        if strict {
            if items.len() < block.min_items {
                return Err(Error::validation(
                    self.kind,
                    format!(
                        "attribute '{}' requires at least {} block(s), got {}",
                        spec.name,
                        block.min_items,
                        items.len()
                    ),
                ));
            }
            if let Some(max) = block.max_items {
                if items.len() > max {
                    return Err(Error::validation(
                        self.kind,
                        format!(
                            "attribute '{}' allows at most {} block(s), got {}",
                            spec.name,
                            max,
                            items.len()
                        ),
                    ));
                }
            }
        }

        let mut normalized = items
            .into_iter()
            .map(|obj| {
                let attrs = Attributes::from_object(obj);
                let attrs = if strict {
                    block.schema.validate(&attrs)?
                } else {
                    block.schema.canonicalize(&attrs)?
                };
                Ok(attrs.into_value())
            })
            .collect::<Result<Vec<_>>>()?;

        if block.mode == BlockMode::Set {
            normalized.sort_by(compare_canonical);
            normalized.dedup();
        }

        Ok(Value::Array(normalized))
    }
}

// An empty set or block list is indistinguishable from an absent attribute.
fn is_empty_collection(value: &Value) -> bool {
    value.as_array().is_some_and(Vec::is_empty)
}

fn compare_canonical(a: &Value, b: &Value) -> Ordering {
    // Objects built from Attributes have sorted keys, so the serialised form
    // is canonical.
    a.to_string().cmp(&b.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team() -> ResourceDescriptor {
        ResourceDescriptor::new("team")
            .attribute(AttributeSpec::required("name", AttrType::String))
            .attribute(AttributeSpec::optional("member_ids", AttrType::IntSet))
    }

    fn check() -> ResourceDescriptor {
        ResourceDescriptor::new("check")
            .attribute(AttributeSpec::required("name", AttrType::String))
            .attribute(
                AttributeSpec::required("type", AttrType::String)
                    .force_replace()
                    .one_of(&["http", "ping"]),
            )
            .attribute(AttributeSpec::optional("resolution", AttrType::Int).default_value(5))
            .attribute(AttributeSpec::optional_computed("port", AttrType::Int))
            .attribute(AttributeSpec::computed("status", AttrType::String))
    }

    fn settings() -> ResourceDescriptor {
        ResourceDescriptor::new("integration.provider_settings")
            .attribute(AttributeSpec::required("name", AttrType::String))
            .attribute(AttributeSpec::optional("url", AttrType::String))
    }

    #[test]
    fn rejects_unknown_attribute() {
        let attrs = Attributes::new().with("name", "x").with("colour", "red");
        let err = team().validate(&attrs).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn rejects_missing_required() {
        let err = team().validate(&Attributes::new()).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn rejects_declared_computed() {
        let attrs = Attributes::new()
            .with("name", "x")
            .with("type", "http")
            .with("status", "up");
        assert!(check().validate(&attrs).is_err());
    }

    #[test]
    fn applies_defaults_and_leaves_optional_computed_absent() {
        let attrs = Attributes::new().with("name", "x").with("type", "http");
        let normalized = check().validate(&attrs).unwrap();
        assert_eq!(normalized.get_i64("resolution"), Some(5));
        assert!(!normalized.has("port"));
    }

    #[test]
    fn enforces_one_of() {
        let attrs = Attributes::new().with("name", "x").with("type", "gopher");
        assert!(check().validate(&attrs).is_err());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let attrs = Attributes::new().with("name", 12);
        assert!(team().validate(&attrs).is_err());
    }

    #[test]
    fn sets_are_sorted_and_deduplicated() {
        let attrs = Attributes::new()
            .with("name", "x")
            .with("member_ids", json!([3, 1, 2, 3]));
        let normalized = team().validate(&attrs).unwrap();
        assert_eq!(normalized.get("member_ids"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn lists_keep_order() {
        let descriptor = ResourceDescriptor::new("teams")
            .attribute(AttributeSpec::computed("ids", AttrType::IntList));
        let attrs = Attributes::new().with("ids", json!([3, 1, 3]));
        let canonical = descriptor.canonicalize(&attrs).unwrap();
        assert_eq!(canonical.get("ids"), Some(&json!([3, 1, 3])));
    }

    #[test]
    fn reordered_set_produces_no_diff() {
        let old = Attributes::new()
            .with("name", "x")
            .with("member_ids", json!([1, 2, 3]));
        let new = Attributes::new()
            .with("name", "x")
            .with("member_ids", json!([3, 1, 2]));
        assert!(team().diff(&old, &new).unwrap().is_empty());
    }

    #[test]
    fn diff_flags_force_replace() {
        let old = Attributes::new().with("name", "x").with("type", "http");
        let new = Attributes::new().with("name", "y").with("type", "ping");
        let diff = check().diff(&old, &new).unwrap();
        assert_eq!(diff.changed_names(), vec!["name", "type"]);
        assert!(diff.requires_replace());
    }

    #[test]
    fn diff_ignores_computed_and_unset_optional_computed() {
        let old = Attributes::new()
            .with("name", "x")
            .with("type", "http")
            .with("port", 443)
            .with("status", "up");
        let new = Attributes::new().with("name", "x").with("type", "http");
        assert!(check().diff(&old, &new).unwrap().is_empty());
    }

    #[test]
    fn removed_optional_scalar_is_not_a_change() {
        let descriptor = ResourceDescriptor::new("check")
            .attribute(AttributeSpec::required("name", AttrType::String))
            .attribute(AttributeSpec::optional("shouldcontain", AttrType::String))
            .attribute(AttributeSpec::optional("tags", AttrType::StringSet));

        let old = Attributes::new()
            .with("name", "x")
            .with("shouldcontain", "OK")
            .with("tags", json!(["a"]));
        let diff = descriptor
            .diff(&old, &Attributes::new().with("name", "x"))
            .unwrap();
        assert_eq!(diff.changed_names(), vec!["tags"]);

        let changed = Attributes::new().with("name", "x").with("shouldcontain", "FINE");
        let diff = descriptor.diff(&old, &changed).unwrap();
        assert_eq!(diff.changed_names(), vec!["shouldcontain", "tags"]);
    }

    #[test]
    fn nested_block_validated_recursively() {
        let descriptor = ResourceDescriptor::new("integration").attribute(
            AttributeSpec::required(
                "provider_settings",
                AttrType::Block(BlockSpec::single(settings())),
            ),
        );

        let ok = Attributes::new().with("provider_settings", json!({ "name": "hook" }));
        let normalized = descriptor.validate(&ok).unwrap();
        assert_eq!(
            normalized.get("provider_settings"),
            Some(&json!([{ "name": "hook" }]))
        );

        let missing_inner = Attributes::new().with("provider_settings", json!([{ "url": "u" }]));
        let err = descriptor.validate(&missing_inner).unwrap_err();
        assert!(err.to_string().contains("integration.provider_settings"));

        let too_many = Attributes::new().with(
            "provider_settings",
            json!([{ "name": "a" }, { "name": "b" }]),
        );
        assert!(descriptor.validate(&too_many).is_err());
    }

    #[test]
    fn block_sets_compare_unordered() {
        let descriptor = ResourceDescriptor::new("contact").attribute(AttributeSpec::optional(
            "email",
            AttrType::Block(BlockSpec::set(
                ResourceDescriptor::new("contact.email")
                    .attribute(AttributeSpec::required("address", AttrType::String)),
            )),
        ));
        let old = Attributes::new().with(
            "email",
            json!([{ "address": "a@example.com" }, { "address": "b@example.com" }]),
        );
        let new = Attributes::new().with(
            "email",
            json!([{ "address": "b@example.com" }, { "address": "a@example.com" }]),
        );
        assert!(descriptor.diff(&old, &new).unwrap().is_empty());
    }
}
