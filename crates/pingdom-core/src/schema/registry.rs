//! Process-wide descriptor table
//!
//! The registry is assembled with [`SchemaRegistryBuilder`] and is immutable
//! afterwards; share it behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use super::descriptor::ResourceDescriptor;
use crate::error::{Error, Result};

/// Immutable resource kind → descriptor table
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    resources: HashMap<&'static str, Arc<ResourceDescriptor>>,
    data_sources: HashMap<&'static str, Arc<ResourceDescriptor>>,
}

impl SchemaRegistry {
    /// Start building a registry
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Registry holding every built-in resource and lookup kind
    pub fn builtin() -> Self {
        let mut builder = Self::builder();
        for descriptor in crate::resources::descriptors() {
            builder = builder.resource(descriptor);
        }
        for descriptor in crate::lookups::descriptors() {
            builder = builder.data_source(descriptor);
        }
        builder.build()
    }

    /// Descriptor of a mutable resource kind
    pub fn resource(&self, kind: &str) -> Result<&Arc<ResourceDescriptor>> {
        self.resources
            .get(kind)
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    /// Descriptor of a lookup kind
    pub fn data_source(&self, kind: &str) -> Result<&Arc<ResourceDescriptor>> {
        self.data_sources
            .get(kind)
            .ok_or_else(|| Error::UnknownKind(format!("data source {}", kind)))
    }

    /// Registered resource kinds, sorted
    pub fn resource_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.resources.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Registered lookup kinds, sorted
    pub fn data_source_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.data_sources.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

/// Builder for [`SchemaRegistry`]
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    inner: SchemaRegistry,
}

impl SchemaRegistryBuilder {
    /// Register a resource descriptor under its kind
    pub fn resource(mut self, descriptor: ResourceDescriptor) -> Self {
        self.inner
            .resources
            .insert(descriptor.kind(), Arc::new(descriptor));
        self
    }

    /// Register a lookup descriptor under its kind
    pub fn data_source(mut self, descriptor: ResourceDescriptor) -> Self {
        self.inner
            .data_sources
            .insert(descriptor.kind(), Arc::new(descriptor));
        self
    }

    /// Freeze the registry
    pub fn build(self) -> SchemaRegistry {
        self.inner
    }
}
