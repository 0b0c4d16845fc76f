// # pingdom-core
//
// Core library for reconciling declared monitoring resources against the
// Pingdom API.
//
// ## Architecture Overview
//
// - **Credential Resolver** (`config`): layered merge of explicit and
//   environment configuration into a `CredentialSet`
// - **Client Factory** (`client`): `ClientBundle` of one primary client and
//   an optional org-scoped secondary client
// - **Schema Registry** (`schema`): static attribute descriptors per kind
// - **Resource Reconcilers** (`resources`): per-kind wire translation
// - **Lookups** (`lookups`): read-only resolution by natural key
// - **Engine** (`engine`): the shared Create/Read/Update/Delete flow
// - **StateStore** (`state`): last-known state across runs
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The transport is a trait; `pingdom-client`
//    implements it over HTTP
// 2. **Registry-Based**: Kinds are looked up by name, no hard-coded match chains
// 3. **Library-First**: All core functionality can be used as a library
// 4. **No hidden retries**: Failures surface to the caller with kind and id

pub mod attributes;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod lookups;
pub mod registry;
pub mod resources;
pub mod schema;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use attributes::Attributes;
pub use client::ClientBundle;
pub use config::{CredentialSet, EndpointConfig, EngineConfig, ProviderConfig};
pub use engine::{DeleteOutcome, Engine, EntityState, Plan, ReadOutcome, ReconcileEvent, Reconciled};
pub use error::{Error, Result};
pub use registry::ResourceRegistry;
pub use schema::SchemaRegistry;
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{ApiClient, ApiClientFactory, Lookup, Resource, StateStore};
