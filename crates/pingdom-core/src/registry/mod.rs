//! Kind-keyed reconciler registry
//!
//! The registry maps resource and lookup kind names to their reconcilers,
//! avoiding hardcoded match chains in the engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pingdom_core::registry::ResourceRegistry;
//!
//! // All built-in kinds
//! let registry = ResourceRegistry::builtin();
//! assert!(registry.has_resource("team"));
//!
//! // Or register a custom reconciler
//! let mut registry = ResourceRegistry::new();
//! registry.register_resource(Arc::new(MyResource));
//! ```
//!
//! Registration happens during initialization; afterwards the registry is
//! shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::{Lookup, Resource};

/// Resource and lookup reconcilers by kind
#[derive(Default)]
pub struct ResourceRegistry {
    /// Registered resource reconcilers
    resources: HashMap<&'static str, Arc<dyn Resource>>,

    /// Registered lookups
    lookups: HashMap<&'static str, Arc<dyn Lookup>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in kind
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for resource in crate::resources::builtin() {
            registry.register_resource(resource);
        }
        for lookup in crate::lookups::builtin() {
            registry.register_lookup(lookup);
        }
        registry
    }

    /// Register a resource reconciler under its kind
    ///
    /// A later registration for the same kind replaces the earlier one.
    pub fn register_resource(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.kind(), resource);
    }

    /// Register a lookup under its kind
    pub fn register_lookup(&mut self, lookup: Arc<dyn Lookup>) {
        self.lookups.insert(lookup.kind(), lookup);
    }

    /// Reconciler for a resource kind
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn Resource>)`: Registered reconciler
    /// - `Err(Error::UnknownKind)`: Nothing registered under `kind`
    pub fn resource(&self, kind: &str) -> Result<Arc<dyn Resource>> {
        self.resources
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    /// Lookup for a data source kind
    pub fn lookup(&self, kind: &str) -> Result<Arc<dyn Lookup>> {
        self.lookups
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::UnknownKind(format!("data source {}", kind)))
    }

    /// List all registered resource kinds, sorted
    pub fn list_resources(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.resources.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// List all registered lookup kinds, sorted
    pub fn list_lookups(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.lookups.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Check if a resource kind is registered
    pub fn has_resource(&self, kind: &str) -> bool {
        self.resources.contains_key(kind)
    }

    /// Check if a lookup kind is registered
    pub fn has_lookup(&self, kind: &str) -> bool {
        self.lookups.contains_key(kind)
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.list_resources())
            .field("lookups", &self.list_lookups())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use crate::schema::SchemaRegistry;
    use crate::traits::Endpoint;
    use serde_json::Value;

    struct Widget;

    impl Resource for Widget {
        fn kind(&self) -> &'static str {
            "widget"
        }
        fn endpoint(&self) -> Endpoint {
            Endpoint::Checks
        }
        fn to_wire(&self, _attrs: &Attributes) -> Result<Value> {
            Ok(Value::Null)
        }
        fn from_wire(&self, _wire: &Value) -> Result<Attributes> {
            Ok(Attributes::new())
        }
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = ResourceRegistry::new();

        // Initially empty
        assert!(!registry.has_resource("widget"));

        // Register
        registry.register_resource(Arc::new(Widget));

        // Now present
        assert!(registry.has_resource("widget"));
        assert_eq!(registry.list_resources(), vec!["widget"]);
    }

    #[test]
    fn builtin_matches_schema_registry() {
        let registry = ResourceRegistry::builtin();
        let schemas = SchemaRegistry::builtin();
        assert_eq!(registry.list_resources(), schemas.resource_kinds());
        assert_eq!(registry.list_lookups(), schemas.data_source_kinds());
    }

    #[test]
    fn unknown_kind() {
        let registry = ResourceRegistry::builtin();
        assert!(matches!(registry.resource("uptime"), Err(Error::UnknownKind(_))));
        assert!(matches!(registry.lookup("checks"), Err(Error::UnknownKind(_))));
    }
}
