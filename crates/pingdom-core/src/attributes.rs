//! Declared attribute maps
//!
//! An [`Attributes`] value is the declarative, schema-shaped view of one
//! resource instance. Values are plain JSON values; their shape is enforced
//! by the [`ResourceDescriptor`](crate::schema::ResourceDescriptor) of the
//! resource kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute name → value map for one resource instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, Value>,
}

impl Attributes {
    /// Create an empty attribute map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Raw value of an attribute; explicit nulls are reported as absent
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    /// String attribute
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Integer attribute
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Boolean attribute
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Set-of-int attribute; absent reads as empty
    pub fn get_int_set(&self, name: &str) -> Vec<i64> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }

    /// Set-of-string attribute; absent reads as empty
    pub fn get_str_set(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nested block attribute as attribute maps; absent reads as empty
    pub fn get_blocks(&self, name: &str) -> Vec<Attributes> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Attributes::from_object)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First block of a single-block attribute
    pub fn get_block(&self, name: &str) -> Option<Attributes> {
        self.get_blocks(name).into_iter().next()
    }

    /// Whether an attribute is present and non-null
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove an attribute
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Copy of this map restricted to `names`
    pub fn subset(&self, names: &[&str]) -> Attributes {
        self.values
            .iter()
            .filter(|(k, _)| names.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Attribute names, in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over all attributes
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build from a JSON object
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            values: object
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Convert into a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.values.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<Attributes> for Value {
    fn from(attrs: Attributes) -> Self {
        attrs.into_value()
    }
}
