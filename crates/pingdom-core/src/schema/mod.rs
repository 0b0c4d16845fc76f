//! Schema Registry
//!
//! Static attribute tables for every resource and lookup kind. Built once
//! at start-up and shared read-only by every reconciler.

pub mod descriptor;
pub mod registry;

pub use descriptor::{
    AttrType, AttributeChange, AttributeDiff, AttributeSpec, BlockMode, BlockSpec, Mutability,
    Presence, ResourceDescriptor,
};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
